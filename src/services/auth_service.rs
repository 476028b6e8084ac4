use chrono::{DateTime, Duration, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::database::retry::with_backoff;
use crate::dto::auth_dto::{LoginPayload, ResetPasswordPayload, SignupPayload};
use crate::error::{Error, Result};
use crate::models::user::{Role, User};
use crate::services::email_service::EmailService;
use crate::utils::crypto::{hash_password, password_weakness, verify_password};
use crate::utils::token::{generate_verification_token, issue_jwt};

pub const DEVELOPER_SETUP_INTENT: &str = "developer-setup";
const VERIFICATION_TTL_HOURS: i64 = 24;
const RESET_TTL_HOURS: i64 = 1;

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, email_verified, setup_completed, created_at";

/// Role a new account gets. The developer-setup intent wins over any requested role;
/// otherwise the requested role applies, defaulting to client. Only client and
/// developer may sign up.
pub fn resolve_signup_role(intent: Option<&str>, requested: Option<&str>) -> Result<Role> {
    let developer_setup = intent
        .map(|i| i.trim().eq_ignore_ascii_case(DEVELOPER_SETUP_INTENT))
        .unwrap_or(false);
    if developer_setup {
        return Ok(Role::Developer);
    }
    match requested.map(str::parse::<Role>) {
        None => Ok(Role::Client),
        Some(Ok(role @ (Role::Client | Role::Developer))) => Ok(role),
        Some(_) => Err(Error::BadRequest("Invalid role specified".into())),
    }
}

/// A freshly issued session token with the account it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    email: EmailService,
    jwt_secret: String,
    jwt_ttl_hours: i64,
}

impl AuthService {
    pub fn new(pool: PgPool, email: EmailService, jwt_secret: String, jwt_ttl_hours: i64) -> Self {
        Self {
            pool,
            email,
            jwt_secret,
            jwt_ttl_hours,
        }
    }

    pub async fn signup(&self, payload: SignupPayload, query_intent: Option<&str>) -> Result<Session> {
        let intent = query_intent.or(payload.intent.as_deref());
        let role = resolve_signup_role(intent, payload.role.as_deref())?;

        let pool = &self.pool;
        let email = payload.email.trim();
        let existing = with_backoff("signup.lookup", || async move {
            sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(pool)
                .await
                .map_err(Error::from)
        })
        .await?;
        if existing.is_some() {
            return Err(Error::BadRequest(
                "An account with this email already exists".into(),
            ));
        }

        let password_hash = hash_password(&payload.password)?;
        let name = payload.name.as_deref();
        let hash = password_hash.as_str();
        let insert_sql = format!(
            r#"
            INSERT INTO users (email, password_hash, name, role, email_verified,
                               project_types, preferred_cities, languages, specializations)
            VALUES ($1, $2, $3, $4, FALSE, '[]', '[]', '[]', '[]')
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let insert_sql = insert_sql.as_str();
        let verification = generate_verification_token();
        let verification_ref = verification.as_str();
        let user: User = with_backoff("signup.create_account", || {
            create_account(pool, insert_sql, email, hash, name, role, verification_ref)
        })
        .await?;
        tracing::info!(user_id = user.id, role = %role, "user created");

        if let Err(e) = self.email.send_verification(&user.email, &verification).await {
            tracing::warn!(user_id = user.id, error = %e, "failed to send verification email");
        }

        self.open_session(user).await
    }

    pub async fn login(&self, payload: LoginPayload) -> Result<Session> {
        let user = self.find_by_email(payload.email.trim()).await?;
        let user = match user {
            Some(user) if verify_password(&payload.password, &user.password_hash)? => user,
            _ => return Err(Error::Unauthorized("Invalid email or password".into())),
        };

        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        self.open_session(user).await
    }

    pub async fn session_is_active(&self, user_id: i64, token: &str) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM sessions WHERE user_id = $1 AND token = $2 AND expires_at > NOW()",
        )
        .bind(user_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn verify_email(&self, token: &str) -> Result<Session> {
        let mut tx = self.pool.begin().await?;
        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT id, user_id FROM email_verification_tokens
            WHERE token = $1 AND used = FALSE AND expires_at > NOW()
            FOR UPDATE
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((token_id, user_id)) = row else {
            return Err(Error::BadRequest(
                "Invalid or expired verification token".into(),
            ));
        };

        sqlx::query("UPDATE email_verification_tokens SET used = TRUE WHERE id = $1")
            .bind(token_id)
            .execute(&mut *tx)
            .await?;
        let sql = format!(
            "UPDATE users SET email_verified = TRUE, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(user_id, "email verified");
        self.open_session(user).await
    }

    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        let user = self
            .find_by_email(email.trim())
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))?;
        if user.email_verified {
            return Err(Error::BadRequest("Email is already verified".into()));
        }

        sqlx::query("DELETE FROM email_verification_tokens WHERE user_id = $1 AND used = FALSE")
            .bind(user.id)
            .execute(&self.pool)
            .await?;
        let token = generate_verification_token();
        self.store_verification_token(user.id, &token).await?;

        self.email
            .send_verification(&user.email, &token)
            .await
            .map_err(|e| {
                tracing::error!(user_id = user.id, error = %e, "failed to resend verification email");
                Error::Internal("Failed to send verification email".into())
            })
    }

    /// Succeeds whether or not the address belongs to an account.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let Some(user) = self.find_by_email(email.trim()).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1 AND used = FALSE")
            .bind(user.id)
            .execute(&self.pool)
            .await?;
        let token = generate_verification_token();
        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user.id)
        .bind(&token)
        .bind(Utc::now() + Duration::hours(RESET_TTL_HOURS))
        .execute(&self.pool)
        .await?;

        if let Err(e) = self.email.send_password_reset(&user.email, &token).await {
            tracing::error!(user_id = user.id, error = %e, "failed to send password reset email");
        }
        Ok(())
    }

    /// Sets a new password from a one-shot reset token and revokes every session.
    pub async fn reset_password(&self, payload: ResetPasswordPayload) -> Result<()> {
        if let Some(problem) = password_weakness(&payload.password) {
            return Err(Error::BadRequest(problem.into()));
        }

        let mut tx = self.pool.begin().await?;
        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT id, user_id FROM password_reset_tokens
            WHERE token = $1 AND used = FALSE AND expires_at > NOW()
            FOR UPDATE
            "#,
        )
        .bind(&payload.token)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((token_id, user_id)) = row else {
            return Err(Error::BadRequest("Invalid or expired reset token".into()));
        };

        let password_hash = hash_password(&payload.password)?;
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE id = $1")
            .bind(token_id)
            .execute(&mut *tx)
            .await?;
        let revoked = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        tracing::info!(user_id, revoked_sessions = revoked, "password reset");
        Ok(())
    }

    /// Deletes expired sessions and spent or expired one-shot tokens.
    pub async fn purge_expired(&self) -> Result<u64> {
        let sessions = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();
        let verification = sqlx::query(
            "DELETE FROM email_verification_tokens WHERE used = TRUE OR expires_at <= NOW()",
        )
        .execute(&self.pool)
        .await?
        .rows_affected();
        let reset = sqlx::query(
            "DELETE FROM password_reset_tokens WHERE used = TRUE OR expires_at <= NOW()",
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        let total = sessions + verification + reset;
        if total > 0 {
            tracing::info!(sessions, verification, reset, "purged expired auth records");
        }
        Ok(total)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn store_verification_token(&self, user_id: i64, token: &str) -> Result<()> {
        let pool = &self.pool;
        let expires_at = Utc::now() + Duration::hours(VERIFICATION_TTL_HOURS);
        with_backoff("store_verification_token", || {
            insert_verification_token(pool, user_id, token, expires_at)
        })
        .await
    }

    async fn open_session(&self, user: User) -> Result<Session> {
        let role = user.role.parse::<Role>().ok();
        let (token, expires_at) = issue_jwt(
            user.id,
            &user.email,
            role,
            &self.jwt_secret,
            self.jwt_ttl_hours,
        )?;

        let pool = &self.pool;
        let user_id = user.id;
        let session_token = token.as_str();
        with_backoff("open_session", || async move {
            sqlx::query("INSERT INTO sessions (user_id, token, expires_at) VALUES ($1, $2, $3)")
                .bind(user_id)
                .bind(session_token)
                .bind(expires_at)
                .execute(pool)
                .await
                .map(|_| ())
                .map_err(Error::from)
        })
        .await?;

        Ok(Session { token, user })
    }
}

/// Inserts the user row and its first verification token in one transaction.
async fn create_account(
    pool: &PgPool,
    insert_sql: &str,
    email: &str,
    password_hash: &str,
    name: Option<&str>,
    role: Role,
    verification_token: &str,
) -> Result<User> {
    let mut tx = pool.begin().await?;
    let user = sqlx::query_as::<_, User>(insert_sql)
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::BadRequest("An account with this email already exists".into())
            }
            other => Error::from(other),
        })?;
    let expires_at = Utc::now() + Duration::hours(VERIFICATION_TTL_HOURS);
    insert_verification_token(&mut *tx, user.id, verification_token, expires_at).await?;
    tx.commit().await?;
    Ok(user)
}

async fn insert_verification_token<'e, E>(
    executor: E,
    user_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO email_verification_tokens (user_id, token, expires_at) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(token)
    .bind(expires_at)
    .execute(executor)
    .await?;
    Ok(())
}
