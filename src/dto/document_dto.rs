use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::document::{AdminDocument, UserDocument};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentTypeQuery {
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyDocumentPayload {
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<UserDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDocumentListResponse {
    pub documents: Vec<AdminDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub document: UserDocument,
}
