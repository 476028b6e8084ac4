use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    License,
    Certification,
    Testimonial,
    Identity,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::License => "license",
            DocumentType::Certification => "certification",
            DocumentType::Testimonial => "testimonial",
            DocumentType::Identity => "identity",
        }
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "license" => Ok(DocumentType::License),
            "certification" => Ok(DocumentType::Certification),
            "testimonial" => Ok(DocumentType::Testimonial),
            "identity" => Ok(DocumentType::Identity),
            _ => Err("Invalid document type".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserDocument {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub filename: String,
    pub url: String,
    pub size: i64,
    pub metadata: Option<JsonValue>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Document row joined with its owner's email for the moderation queue.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminDocument {
    pub id: i64,
    pub user_id: i64,
    pub user_email: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub filename: String,
    pub url: String,
    pub size: i64,
    pub metadata: Option<JsonValue>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}
