use sqlx::PgPool;

use crate::error::Result;
use crate::models::user::UserSummary;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<UserSummary>> {
        Ok(sqlx::query_as::<_, UserSummary>(
            "SELECT id, email, name, role, created_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
