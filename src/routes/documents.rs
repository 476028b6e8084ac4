use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::{
        auth_dto::MessageResponse,
        document_dto::{
            AdminDocumentListResponse, DocumentListResponse, DocumentResponse,
            DocumentTypeQuery, VerifyDocumentPayload,
        },
    },
    error::{Error, Result},
    middleware::auth::AuthUser,
    models::document::DocumentType,
    routes::multipart::read_upload,
    utils::validation::ValidJson,
    AppState,
};

const DOCUMENT_TYPE_HEADER: &str = "x-document-type";

/// Origin used in stored document URLs: the configured backend URL, else the
/// request's own host.
fn public_base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.config.backend_url {
        return url.clone();
    }
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{}://{}", scheme, host)
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/documents",
    params(
        ("id" = i64, Path, description = "Owner user ID"),
        ("type" = Option<String>, Query, description = "license, certification, testimonial or identity")
    ),
    responses(
        (status = 201, description = "Document stored"),
        (status = 400, description = "Missing or invalid type, or unacceptable file"),
        (status = 403, description = "Not the owner")
    )
)]
#[axum::debug_handler]
pub async fn upload_document(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<DocumentTypeQuery>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    user.require_owner(user_id, false)?;

    let form = read_upload(multipart, "file").await?;
    let requested_type = query
        .doc_type
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            headers
                .get(DOCUMENT_TYPE_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string)
        })
        .or_else(|| form.field("type").map(str::to_string))
        .ok_or_else(|| Error::BadRequest("Document type is required".into()))?;
    let doc_type: DocumentType = requested_type.parse().map_err(Error::BadRequest)?;
    let file = form.require_file()?;

    let base_url = public_base_url(&state, &headers);
    let document = state
        .document_service
        .upload(user_id, doc_type, file, &base_url)
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/documents",
    params(
        ("id" = i64, Path, description = "Owner user ID")
    ),
    responses(
        (status = 200, description = "Owner's documents", body = DocumentListResponse),
        (status = 403, description = "Not the owner")
    )
)]
#[axum::debug_handler]
pub async fn list_documents(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    user.require_owner(user_id, false)?;
    let documents = state.document_service.list_for_user(user_id).await?;
    Ok(Json(DocumentListResponse { documents }))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/documents/{doc_id}",
    params(
        ("id" = i64, Path, description = "Owner user ID"),
        ("doc_id" = i64, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document deleted", body = MessageResponse),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Document not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_document(
    State(state): State<AppState>,
    Path((user_id, document_id)): Path<(i64, i64)>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    user.require_owner(user_id, true)?;
    state.document_service.delete(user_id, document_id).await?;
    Ok(Json(MessageResponse::new("Document deleted")))
}

#[utoipa::path(
    get,
    path = "/api/admin/documents",
    responses(
        (status = 200, description = "Every document with its owner's email", body = AdminDocumentListResponse),
        (status = 403, description = "Admins only")
    )
)]
#[axum::debug_handler]
pub async fn list_all_documents(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;
    let documents = state.document_service.list_all().await?;
    Ok(Json(AdminDocumentListResponse { documents }))
}

#[utoipa::path(
    patch,
    path = "/api/admin/documents/{doc_id}",
    params(
        ("doc_id" = i64, Path, description = "Document ID")
    ),
    request_body = VerifyDocumentPayload,
    responses(
        (status = 200, description = "Verification flag updated", body = DocumentResponse),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Document not found")
    )
)]
#[axum::debug_handler]
pub async fn verify_document(
    State(state): State<AppState>,
    Path(document_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    ValidJson(payload): ValidJson<VerifyDocumentPayload>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;
    let document = state
        .document_service
        .set_verified(document_id, payload.verified)
        .await?;
    Ok(Json(DocumentResponse { document }))
}
