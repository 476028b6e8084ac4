use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::user::UserProfile;
use crate::services::completion::{ProfileFields, StringList};

/// Years of experience as a number or a string of digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearsExperience {
    Count(i64),
    Text(String),
}

impl YearsExperience {
    /// `None` when the value is not a non-negative integer that fits the column.
    pub fn value(&self) -> Option<i32> {
        let n = match self {
            YearsExperience::Count(n) => *n,
            YearsExperience::Text(text) => {
                if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                text.parse::<i64>().ok()?
            }
        };
        i32::try_from(n).ok().filter(|n| *n >= 0)
    }
}

/// Body of `PUT /api/auth/me`. Every field replaces the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfilePayload {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub preferred_contact: Option<String>,
    pub company_type: Option<String>,
    #[validate(custom(function = "validate_years_experience"))]
    pub years_experience: Option<YearsExperience>,
    pub project_types: Option<StringList>,
    pub preferred_cities: Option<StringList>,
    pub budget_range: Option<String>,
    pub working_style: Option<String>,
    pub availability: Option<String>,
    pub specializations: Option<StringList>,
    pub languages: Option<StringList>,
    /// Marks setup complete even when required fields are missing.
    pub setup_completed: Option<bool>,
}

fn validate_years_experience(years: &YearsExperience) -> Result<(), ValidationError> {
    if years.value().is_some() {
        return Ok(());
    }
    let mut error = ValidationError::new("integer");
    error.message = Some("Years of experience must be a whole number".into());
    Err(error)
}

impl UpdateProfilePayload {
    pub fn force_complete(&self) -> bool {
        self.setup_completed == Some(true)
    }

    /// Call after [`Validate::validate`]; invalid years are dropped here.
    pub fn into_fields(self) -> ProfileFields {
        ProfileFields {
            name: self.name,
            bio: self.bio,
            phone: self.phone,
            location: self.location,
            preferred_contact: self.preferred_contact,
            company_type: self.company_type,
            years_experience: self.years_experience.as_ref().and_then(YearsExperience::value),
            project_types: self.project_types,
            preferred_cities: self.preferred_cities,
            budget_range: self.budget_range,
            working_style: self.working_style,
            availability: self.availability,
            specializations: self.specializations,
            languages: self.languages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: UserProfile,
}
