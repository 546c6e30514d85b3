use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use super::client_ip;
use crate::dtos::auth::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, VerifyQuery,
};
use crate::dtos::{ErrorResponse, MessageResponse};
use crate::services::{AuthSession, NewAccount};
use crate::utils::{Password, ValidatedJson};
use crate::AppState;

/// Register a new account and its company
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthSession),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .accounts
        .register(
            NewAccount {
                email: req.email,
                password: Password::new(req.password),
                first_name: req.first_name,
                last_name: req.last_name,
                phone: req.phone,
            },
            client_ip(&headers),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthSession),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account disabled", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let session = state
        .accounts
        .login(&req.email, &Password::new(req.password), client_ip(&headers))
        .await?;
    Ok(Json(session))
}

/// Confirm an email address
#[utoipa::path(
    get,
    path = "/auth/verify",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    query.validate()?;
    state.accounts.verify_email(&query.token).await?;
    Ok(Json(MessageResponse::new("Email verified")))
}

/// Request a password reset link
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent if the account exists", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.accounts.forgot_password(&req.email).await?;
    Ok(Json(MessageResponse::new(
        "If the address is registered, a reset link has been sent",
    )))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .accounts
        .reset_password(&req.token, &Password::new(req.password))
        .await?;
    Ok(Json(MessageResponse::new("Password changed")))
}
