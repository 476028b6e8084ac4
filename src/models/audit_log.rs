use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

/// One finished HTTP exchange waiting to be written to `form_submissions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub user_id: Option<i64>,
    pub route: String,
    pub method: String,
    pub status_code: u16,
    pub request_body: Option<JsonValue>,
    pub request_query: Option<JsonValue>,
    pub response_body: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FormSubmission {
    pub id: i64,
    pub user_id: Option<i64>,
    pub route: String,
    pub method: String,
    pub status: i32,
    pub request_body: Option<JsonValue>,
    pub request_query: Option<JsonValue>,
    pub response_body: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}
