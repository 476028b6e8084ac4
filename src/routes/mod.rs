pub mod auth;
pub mod documents;
pub mod health;
pub mod multipart;
pub mod projects;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{audit::audit_submission, auth::require_auth, cors::cors_layer};
use crate::AppState;

// Multipart framing overhead on top of the largest accepted file.
const BODY_SLACK_BYTES: usize = 64 * 1024;

/// The complete HTTP surface: public and session-protected API routes, the uploads
/// directory, and the audit, CORS and tracing layers around all of it.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/status", get(health::status))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/verify-email", post(auth::verify_email))
        .route(
            "/api/auth/resend-verification",
            post(auth::resend_verification),
        )
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password));

    let protected = Router::new()
        .route("/api/auth/me", get(auth::me).put(auth::update_profile))
        .route("/api/users", get(users::list_users))
        .route(
            "/api/users/:id/documents",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route(
            "/api/users/:id/documents/:doc_id",
            delete(documents::delete_document),
        )
        .route("/api/admin/documents", get(documents::list_all_documents))
        .route(
            "/api/admin/documents/:doc_id",
            patch(documents::verify_document),
        )
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/:id",
            put(projects::update_project).delete(projects::delete_project),
        )
        .route("/api/projects/:id/media", post(projects::upload_media))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let body_limit = state.config.max_upload_bytes + BODY_SLACK_BYTES;

    public
        .merge(protected)
        .nest_service("/uploads", ServeDir::new(&state.config.uploads_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn_with_state(state.audit.clone(), audit_submission))
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
