use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};

use crate::{
    dto::{
        auth_dto::{
            AuthUserResponse, EmailPayload, LoginPayload, MeResponse, MessageResponse,
            ResetPasswordPayload, SessionResponse, SignupPayload, SignupQuery,
            VerifyEmailPayload,
        },
        profile_dto::{ProfileResponse, UpdateProfilePayload},
    },
    error::Result,
    middleware::auth::{bearer_token, AuthUser},
    services::auth_service::Session,
    utils::validation::ValidJson,
    AppState,
};

fn session_response(message: &str, session: Session) -> SessionResponse {
    SessionResponse {
        message: message.to_string(),
        token: session.token,
        user: AuthUserResponse::from(session.user),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    params(
        ("intent" = Option<String>, Query, description = "`developer-setup` creates a developer account")
    ),
    request_body = SignupPayload,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 400, description = "Validation error, duplicate email or invalid role")
    )
)]
#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    Query(query): Query<SignupQuery>,
    ValidJson(payload): ValidJson<SignupPayload>,
) -> Result<impl IntoResponse> {
    let session = state
        .auth_service
        .signup(payload, query.intent.as_deref())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(session_response(
            "Account created successfully. Please check your email to verify your account.",
            session,
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginPayload>,
) -> Result<impl IntoResponse> {
    let session = state.auth_service.login(payload).await?;
    Ok(Json(session_response("Signed in successfully", session)))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Missing or expired session")
    )
)]
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let account = state.auth_service.get_user(user.user_id).await?;
    Ok(Json(MeResponse {
        user: AuthUserResponse::from(account),
    }))
}

#[utoipa::path(
    put,
    path = "/api/auth/me",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(payload): ValidJson<UpdateProfilePayload>,
) -> Result<impl IntoResponse> {
    let profile = state
        .profile_service
        .update_profile(user.user_id, payload)
        .await?;
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully".to_string(),
        user: profile,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session removed", body = MessageResponse)
    )
)]
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    if let Some(token) = bearer_token(&headers) {
        state.auth_service.logout(token).await?;
    }
    Ok(Json(MessageResponse::new("Signed out successfully")))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    request_body = VerifyEmailPayload,
    responses(
        (status = 200, description = "Email verified, new session issued", body = SessionResponse),
        (status = 400, description = "Invalid or expired verification token")
    )
)]
#[axum::debug_handler]
pub async fn verify_email(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<VerifyEmailPayload>,
) -> Result<impl IntoResponse> {
    let session = state.auth_service.verify_email(payload.token.trim()).await?;
    Ok(Json(session_response("Email verified successfully", session)))
}

#[utoipa::path(
    post,
    path = "/api/auth/resend-verification",
    request_body = EmailPayload,
    responses(
        (status = 200, description = "Verification email sent", body = MessageResponse),
        (status = 400, description = "Email already verified"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn resend_verification(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<EmailPayload>,
) -> Result<impl IntoResponse> {
    state.auth_service.resend_verification(&payload.email).await?;
    Ok(Json(MessageResponse::new(
        "Verification email sent successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = EmailPayload,
    responses(
        (status = 200, description = "Same answer whether or not the account exists", body = MessageResponse)
    )
)]
#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<EmailPayload>,
) -> Result<impl IntoResponse> {
    state.auth_service.forgot_password(&payload.email).await?;
    Ok(Json(MessageResponse::new(
        "If an account with this email exists, a password reset link has been sent.",
    )))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Password changed, sessions revoked", body = MessageResponse),
        (status = 400, description = "Weak password or invalid token")
    )
)]
#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ResetPasswordPayload>,
) -> Result<impl IntoResponse> {
    state.auth_service.reset_password(payload).await?;
    Ok(Json(MessageResponse::new("Password reset successfully")))
}
