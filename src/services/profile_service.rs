use sqlx::PgPool;

use crate::dto::profile_dto::UpdateProfilePayload;
use crate::error::{Error, Result};
use crate::models::user::{Role, UserProfile};
use crate::services::completion::{self, POLICY_VERSION};

const PROFILE_COLUMNS: &str = r#"id, email, name, role, bio, phone, location, preferred_contact,
    company_type, years_experience, project_types, preferred_cities, languages, budget_range,
    working_style, availability, specializations, setup_completed, email_verified"#;

#[derive(Clone)]
pub struct ProfileService {
    pool: PgPool,
}

impl ProfileService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replaces the onboarding fields and, when the result is complete for the
    /// user's role (or the caller forces it), raises `setup_completed`. The flag is
    /// never lowered here.
    pub async fn update_profile(
        &self,
        user_id: i64,
        payload: UpdateProfilePayload,
    ) -> Result<UserProfile> {
        let force = payload.force_complete();
        let fields = payload.into_fields();

        let mut tx = self.pool.begin().await?;
        let stored_role = sqlx::query_scalar::<_, String>(
            "SELECT role FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".into()))?;
        let role = stored_role.parse::<Role>().ok();

        let (profile, completion) = completion::evaluate(role, fields);
        let mark_complete = completion.complete || force;
        tracing::debug!(
            user_id,
            role = %stored_role,
            policy_version = POLICY_VERSION,
            complete = completion.complete,
            forced = force,
            missing = ?completion.missing.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            "profile completion evaluated"
        );

        let sql = format!(
            r#"
            UPDATE users SET
                name = $1, bio = $2, phone = $3, location = $4, preferred_contact = $5,
                company_type = $6, years_experience = $7, project_types = $8,
                preferred_cities = $9, budget_range = $10, working_style = $11,
                availability = $12, specializations = $13, languages = $14,
                setup_completed = setup_completed OR $15,
                updated_at = NOW()
            WHERE id = $16
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        );
        let updated = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(&profile.name)
            .bind(&profile.bio)
            .bind(&profile.phone)
            .bind(&profile.location)
            .bind(&profile.preferred_contact)
            .bind(&profile.company_type)
            .bind(profile.stored_years_experience())
            .bind(&profile.project_types)
            .bind(&profile.preferred_cities)
            .bind(&profile.budget_range)
            .bind(&profile.working_style)
            .bind(&profile.availability)
            .bind(&profile.specializations)
            .bind(&profile.languages)
            .bind(mark_complete)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        if mark_complete {
            tracing::info!(
                user_id,
                reason = if completion.complete { "required fields present" } else { "forced" },
                "profile setup completed"
            );
        }
        Ok(updated)
    }
}
