//! Role-specific profile completeness.
//!
//! Each role maps to a fixed table of required fields and the emptiness rule
//! applied to each. Roles without a table (admin, or a role that could not be
//! read) are never complete.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::models::user::Role;

/// Bumped whenever a requirement table changes.
pub const POLICY_VERSION: u32 = 1;

const EMPTY_LIST: &str = "[]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Bio,
    Phone,
    Location,
    PreferredContact,
    CompanyType,
    YearsExperience,
    ProjectTypes,
    PreferredCities,
    BudgetRange,
    WorkingStyle,
    Availability,
    Specializations,
}

impl ProfileField {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Bio => "bio",
            ProfileField::Phone => "phone",
            ProfileField::Location => "location",
            ProfileField::PreferredContact => "preferred_contact",
            ProfileField::CompanyType => "company_type",
            ProfileField::YearsExperience => "years_experience",
            ProfileField::ProjectTypes => "project_types",
            ProfileField::PreferredCities => "preferred_cities",
            ProfileField::BudgetRange => "budget_range",
            ProfileField::WorkingStyle => "working_style",
            ProfileField::Availability => "availability",
            ProfileField::Specializations => "specializations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emptiness {
    /// Absent, or only whitespace.
    Blank,
    /// [`Emptiness::Blank`], or the canonical empty list `[]`.
    BlankOrEmptyList,
}

pub type Requirement = (ProfileField, Emptiness);

pub const CLIENT_REQUIREMENTS: &[Requirement] = &[
    (ProfileField::Name, Emptiness::Blank),
    (ProfileField::Phone, Emptiness::Blank),
    (ProfileField::Location, Emptiness::Blank),
    (ProfileField::Bio, Emptiness::Blank),
    (ProfileField::PreferredContact, Emptiness::Blank),
];

pub const DEVELOPER_REQUIREMENTS: &[Requirement] = &[
    (ProfileField::Name, Emptiness::BlankOrEmptyList),
    (ProfileField::Bio, Emptiness::BlankOrEmptyList),
    (ProfileField::CompanyType, Emptiness::BlankOrEmptyList),
    (ProfileField::YearsExperience, Emptiness::BlankOrEmptyList),
    (ProfileField::ProjectTypes, Emptiness::BlankOrEmptyList),
    (ProfileField::PreferredCities, Emptiness::BlankOrEmptyList),
    (ProfileField::BudgetRange, Emptiness::BlankOrEmptyList),
    (ProfileField::WorkingStyle, Emptiness::BlankOrEmptyList),
    (ProfileField::Availability, Emptiness::BlankOrEmptyList),
    (ProfileField::Specializations, Emptiness::BlankOrEmptyList),
];

pub fn requirements(role: Option<Role>) -> Option<&'static [Requirement]> {
    match role? {
        Role::Client => Some(CLIENT_REQUIREMENTS),
        Role::Developer => Some(DEVELOPER_REQUIREMENTS),
        Role::Admin => None,
    }
}

/// A list field as clients send it: a native array or an already serialized string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    Items(Vec<String>),
    Serialized(String),
}

impl StringList {
    /// Compact JSON array text. A serialized string that is not a JSON array of
    /// strings is kept verbatim; a blank one becomes `[]`.
    pub fn canonical(&self) -> String {
        match self {
            StringList::Items(items) => encode_list(items),
            StringList::Serialized(raw) => {
                if raw.trim().is_empty() {
                    return EMPTY_LIST.to_string();
                }
                match serde_json::from_str::<Vec<String>>(raw) {
                    Ok(items) => encode_list(&items),
                    Err(_) => raw.clone(),
                }
            }
        }
    }
}

fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| EMPTY_LIST.to_string())
}

fn canonical_or_empty(list: Option<&StringList>) -> String {
    list.map(StringList::canonical)
        .unwrap_or_else(|| EMPTY_LIST.to_string())
}

/// Candidate values from a profile update, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFields {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub preferred_contact: Option<String>,
    pub company_type: Option<String>,
    pub years_experience: Option<i32>,
    pub project_types: Option<StringList>,
    pub preferred_cities: Option<StringList>,
    pub budget_range: Option<String>,
    pub working_style: Option<String>,
    pub availability: Option<String>,
    pub specializations: Option<StringList>,
    pub languages: Option<StringList>,
}

/// Values exactly as they are written to `users`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProfile {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub preferred_contact: Option<String>,
    pub company_type: Option<String>,
    pub years_experience: Option<i32>,
    pub project_types: String,
    pub preferred_cities: String,
    pub budget_range: Option<String>,
    pub working_style: Option<String>,
    pub availability: Option<String>,
    pub specializations: String,
    pub languages: String,
}

impl NormalizedProfile {
    fn from_fields(fields: ProfileFields) -> Self {
        Self {
            project_types: canonical_or_empty(fields.project_types.as_ref()),
            preferred_cities: canonical_or_empty(fields.preferred_cities.as_ref()),
            specializations: canonical_or_empty(fields.specializations.as_ref()),
            languages: canonical_or_empty(fields.languages.as_ref()),
            name: fields.name,
            bio: fields.bio,
            phone: fields.phone,
            location: fields.location,
            preferred_contact: fields.preferred_contact,
            company_type: fields.company_type,
            years_experience: fields.years_experience,
            budget_range: fields.budget_range,
            working_style: fields.working_style,
            availability: fields.availability,
        }
    }

    /// The column is NOT NULL; an omitted value is stored as zero.
    pub fn stored_years_experience(&self) -> i32 {
        self.years_experience.unwrap_or(0)
    }

    fn text(&self, field: ProfileField) -> Option<Cow<'_, str>> {
        fn borrowed(v: &Option<String>) -> Option<Cow<'_, str>> {
            v.as_deref().map(Cow::Borrowed)
        }
        match field {
            ProfileField::Name => borrowed(&self.name),
            ProfileField::Bio => borrowed(&self.bio),
            ProfileField::Phone => borrowed(&self.phone),
            ProfileField::Location => borrowed(&self.location),
            ProfileField::PreferredContact => borrowed(&self.preferred_contact),
            ProfileField::CompanyType => borrowed(&self.company_type),
            ProfileField::YearsExperience => {
                self.years_experience.map(|n| Cow::Owned(n.to_string()))
            }
            ProfileField::ProjectTypes => Some(Cow::Borrowed(&self.project_types)),
            ProfileField::PreferredCities => Some(Cow::Borrowed(&self.preferred_cities)),
            ProfileField::BudgetRange => borrowed(&self.budget_range),
            ProfileField::WorkingStyle => borrowed(&self.working_style),
            ProfileField::Availability => borrowed(&self.availability),
            ProfileField::Specializations => Some(Cow::Borrowed(&self.specializations)),
        }
    }

    fn is_missing(&self, field: ProfileField, emptiness: Emptiness) -> bool {
        match self.text(field) {
            None => true,
            Some(value) => {
                let value = value.trim();
                value.is_empty() || (emptiness == Emptiness::BlankOrEmptyList && value == EMPTY_LIST)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub complete: bool,
    /// Required fields that failed their emptiness rule, in table order.
    pub missing: Vec<ProfileField>,
}

/// Normalizes `fields` and judges them against the requirement table for `role`.
pub fn evaluate(role: Option<Role>, fields: ProfileFields) -> (NormalizedProfile, Completion) {
    let profile = NormalizedProfile::from_fields(fields);
    let completion = match requirements(role) {
        Some(table) => {
            let missing: Vec<ProfileField> = table
                .iter()
                .filter(|(field, emptiness)| profile.is_missing(*field, *emptiness))
                .map(|(field, _)| *field)
                .collect();
            Completion {
                complete: missing.is_empty(),
                missing,
            }
        }
        None => Completion {
            complete: false,
            missing: Vec::new(),
        },
    };
    (profile, completion)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn list(items: &[&str]) -> Option<StringList> {
        Some(StringList::Items(items.iter().map(|s| s.to_string()).collect()))
    }

    fn full_client() -> ProfileFields {
        ProfileFields {
            name: text("Ada Obi"),
            phone: text("+2348000000000"),
            location: text("Lagos"),
            bio: text("Building a family home"),
            preferred_contact: text("email"),
            ..Default::default()
        }
    }

    fn full_developer() -> ProfileFields {
        ProfileFields {
            name: text("Kofi Builders"),
            bio: text("Residential contractor"),
            company_type: text("company"),
            years_experience: Some(12),
            project_types: list(&["residential", "renovation"]),
            preferred_cities: list(&["Accra"]),
            budget_range: text("50k-100k"),
            working_style: text("milestones"),
            availability: text("immediately"),
            specializations: list(&["roofing"]),
            ..Default::default()
        }
    }

    #[test]
    fn client_with_all_required_fields_is_complete() {
        let (_, completion) = evaluate(Some(Role::Client), full_client());
        assert!(completion.complete);
        assert!(completion.missing.is_empty());
    }

    #[test]
    fn whitespace_only_client_field_is_missing() {
        let mut fields = full_client();
        fields.phone = text("   ");
        let (_, completion) = evaluate(Some(Role::Client), fields);
        assert!(!completion.complete);
        assert_eq!(completion.missing, vec![ProfileField::Phone]);
    }

    #[test]
    fn developer_with_all_required_fields_is_complete() {
        let (_, completion) = evaluate(Some(Role::Developer), full_developer());
        assert!(completion.complete, "missing: {:?}", completion.missing);
    }

    #[test]
    fn developer_missing_any_required_field_is_incomplete() {
        for (field, _) in DEVELOPER_REQUIREMENTS {
            let mut fields = full_developer();
            match field {
                ProfileField::Name => fields.name = None,
                ProfileField::Bio => fields.bio = None,
                ProfileField::CompanyType => fields.company_type = None,
                ProfileField::YearsExperience => fields.years_experience = None,
                ProfileField::ProjectTypes => fields.project_types = None,
                ProfileField::PreferredCities => fields.preferred_cities = None,
                ProfileField::BudgetRange => fields.budget_range = None,
                ProfileField::WorkingStyle => fields.working_style = None,
                ProfileField::Availability => fields.availability = None,
                ProfileField::Specializations => fields.specializations = None,
                other => panic!("unexpected developer requirement {:?}", other),
            }
            let (_, completion) = evaluate(Some(Role::Developer), fields);
            assert!(!completion.complete, "{} should be required", field.as_str());
            assert_eq!(completion.missing, vec![*field]);
        }
    }

    #[test]
    fn empty_list_counts_as_missing_for_developers() {
        let mut fields = full_developer();
        fields.preferred_cities = Some(StringList::Serialized("[]".into()));
        fields.specializations = list(&[]);
        let (_, completion) = evaluate(Some(Role::Developer), fields);
        assert_eq!(
            completion.missing,
            vec![ProfileField::PreferredCities, ProfileField::Specializations]
        );
    }

    #[test]
    fn zero_years_experience_is_a_value() {
        let mut fields = full_developer();
        fields.years_experience = Some(0);
        let (profile, completion) = evaluate(Some(Role::Developer), fields);
        assert!(completion.complete);
        assert_eq!(profile.stored_years_experience(), 0);
    }

    #[test]
    fn native_and_serialized_lists_store_identically() {
        let mut native = full_developer();
        native.project_types = list(&["residential", "commercial"]);
        let mut serialized = full_developer();
        serialized.project_types = Some(StringList::Serialized(
            r#"[ "residential",  "commercial" ]"#.into(),
        ));

        let (a, _) = evaluate(Some(Role::Developer), native);
        let (b, _) = evaluate(Some(Role::Developer), serialized);
        assert_eq!(a.project_types, r#"["residential","commercial"]"#);
        assert_eq!(a.project_types, b.project_types);
    }

    #[test]
    fn absent_lists_normalize_to_empty_list() {
        let (profile, _) = evaluate(Some(Role::Client), full_client());
        assert_eq!(profile.project_types, "[]");
        assert_eq!(profile.preferred_cities, "[]");
        assert_eq!(profile.specializations, "[]");
        assert_eq!(profile.languages, "[]");
        assert_eq!(profile.stored_years_experience(), 0);
    }

    #[test]
    fn unparseable_serialized_list_is_kept_verbatim() {
        let raw = StringList::Serialized("roofing, plumbing".into());
        assert_eq!(raw.canonical(), "roofing, plumbing");
        assert_eq!(StringList::Serialized("  ".into()).canonical(), "[]");
    }

    #[test]
    fn roles_without_a_table_are_never_complete() {
        let (_, unknown) = evaluate(None, full_client());
        assert!(!unknown.complete);
        let (_, admin) = evaluate(Some(Role::Admin), full_developer());
        assert!(!admin.complete);
    }

    #[test]
    fn string_list_accepts_array_or_string() {
        let items: StringList = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(items, StringList::Items(vec!["a".into(), "b".into()]));
        let serialized: StringList = serde_json::from_str(r#""[\"a\"]""#).unwrap();
        assert_eq!(serialized.canonical(), r#"["a"]"#);
        assert!(serde_json::from_str::<StringList>("[1, 2]").is_err());
    }
}
