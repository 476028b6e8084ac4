use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::{
        auth_dto::MessageResponse,
        project_dto::{
            CreateProjectPayload, ProjectListResponse, ProjectMediaResponse, ProjectResponse,
            UpdateProjectPayload,
        },
    },
    error::Result,
    middleware::auth::AuthUser,
    routes::multipart::read_upload,
    utils::validation::ValidJson,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = CreateProjectPayload,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Title or description missing")
    )
)]
#[axum::debug_handler]
pub async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(payload): ValidJson<CreateProjectPayload>,
) -> Result<impl IntoResponse> {
    let project = state.project_service.create(user.user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProjectResponse {
            message: "Project created successfully".to_string(),
            project,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/projects",
    responses(
        (status = 200, description = "Caller's projects, newest first", body = ProjectListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let projects = state.project_service.list_for_client(user.user_id).await?;
    Ok(Json(ProjectListResponse { projects }))
}

#[utoipa::path(
    put,
    path = "/api/projects/{id}",
    params(
        ("id" = i64, Path, description = "Project ID")
    ),
    request_body = UpdateProjectPayload,
    responses(
        (status = 200, description = "Project replaced", body = ProjectResponse),
        (status = 403, description = "Project belongs to someone else"),
        (status = 404, description = "Project not found")
    )
)]
#[axum::debug_handler]
pub async fn update_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    ValidJson(payload): ValidJson<UpdateProjectPayload>,
) -> Result<impl IntoResponse> {
    let project = state
        .project_service
        .update(project_id, user.user_id, payload)
        .await?;
    Ok(Json(ProjectResponse {
        message: "Project updated successfully".to_string(),
        project,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    params(
        ("id" = i64, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project and its media deleted", body = MessageResponse),
        (status = 403, description = "Project belongs to someone else"),
        (status = 404, description = "Project not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    state.project_service.delete(project_id, user.user_id).await?;
    Ok(Json(MessageResponse::new("Project deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/api/projects/{id}/media",
    params(
        ("id" = i64, Path, description = "Project ID")
    ),
    responses(
        (status = 201, description = "Media stored", body = ProjectMediaResponse),
        (status = 400, description = "Missing or unacceptable file"),
        (status = 403, description = "Project belongs to someone else")
    )
)]
#[axum::debug_handler]
pub async fn upload_media(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let file = read_upload(multipart, "file").await?.require_file()?;
    let media = state
        .project_service
        .add_media(project_id, user.user_id, file)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ProjectMediaResponse {
            message: "Media uploaded successfully".to_string(),
            media,
        }),
    ))
}
