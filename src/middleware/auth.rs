use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::models::user::Role;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

/// Identity established by [`require_auth`], available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub role: Option<Role>,
    pub token: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden("Unauthorized".into()))
        }
    }

    /// Owners may act on their own resources; admins on anyone's when `allow_admin`.
    pub fn require_owner(&self, owner_id: i64, allow_admin: bool) -> Result<()> {
        if self.user_id == owner_id || (allow_admin && self.is_admin()) {
            Ok(())
        } else {
            Err(Error::Forbidden("Unauthorized".into()))
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Validates the bearer JWT and its session row, then exposes [`AuthUser`].
///
/// The identity is also stamped on the response so outer layers (the audit
/// interceptor) can attribute the exchange.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(token) = bearer_token(req.headers()).map(str::to_string) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Access token required"})),
        )
            .into_response();
    };

    let claims = match decode_claims(&token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => {
            return (StatusCode::FORBIDDEN, Json(json!({"error": "Invalid token"}))).into_response()
        }
    };
    let Ok(user_id) = claims.sub.parse::<i64>() else {
        return (StatusCode::FORBIDDEN, Json(json!({"error": "Invalid token"}))).into_response();
    };

    match state.auth_service.session_is_active(user_id, &token).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid or expired session"})),
            )
                .into_response()
        }
        Err(e) => return e.into_response(),
    }

    let user = AuthUser {
        user_id,
        email: claims.email,
        role: claims.role.as_deref().and_then(|r| r.parse().ok()),
        token,
    };
    req.extensions_mut().insert(user.clone());
    let mut response = next.run(req).await;
    response.extensions_mut().insert(user);
    response
}
