use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;

use crate::{error::Result, middleware::auth::AuthUser, AppState};

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All accounts, newest first"),
        (status = 403, description = "Admins only")
    )
)]
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;
    let users = state.user_service.list().await?;
    Ok(Json(json!({ "users": users })))
}
