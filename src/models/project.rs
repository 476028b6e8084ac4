use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub client_id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub project_type: String,
    pub location: String,
    pub budget: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectMedia {
    pub id: i64,
    pub project_id: i64,
    pub media_type: String,
    pub url: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}
