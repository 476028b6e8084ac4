pub mod audit_service;
pub mod auth_service;
pub mod completion;
pub mod document_service;
pub mod email_service;
pub mod profile_service;
pub mod project_service;
pub mod storage_service;
pub mod user_service;
