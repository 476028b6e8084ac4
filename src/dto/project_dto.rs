use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::project::{Project, ProjectMedia};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProjectPayload {
    #[validate(length(min = 1, message = "Project title is required"))]
    pub title: String,
    #[serde(rename = "type")]
    pub project_type: Option<String>,
    pub location: Option<String>,
    pub budget: Option<String>,
    #[validate(length(min = 1, message = "Project description is required"))]
    pub description: String,
}

/// Full replacement of a project's editable fields; absent values become empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProjectPayload {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub project_type: Option<String>,
    pub location: Option<String>,
    pub budget: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectResponse {
    pub message: String,
    pub project: Project,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMediaResponse {
    pub message: String,
    pub media: ProjectMedia,
}
