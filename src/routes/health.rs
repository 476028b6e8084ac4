use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

#[axum::debug_handler]
pub async fn health() -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "message": "BuildTrust API is running",
    });
    (StatusCode::OK, Json(body))
}

/// Liveness plus a database round trip.
#[axum::debug_handler]
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let database_up = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let (status, overall, database) = if database_up {
        (StatusCode::OK, "ok", "up")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
    };
    let body = json!({
        "status": overall,
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
    });
    (status, Json(body))
}
