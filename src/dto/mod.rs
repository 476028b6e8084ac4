pub mod auth_dto;
pub mod document_dto;
pub mod profile_dto;
pub mod project_dto;
