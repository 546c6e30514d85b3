use axum::{extract::State, http::HeaderMap, Json};
use service_core::error::AppError;

use super::client_ip;
use crate::dtos::auth::{ChangePasswordRequest, MeResponse, UpdateProfileRequest};
use crate::dtos::{non_blank, ErrorResponse, MessageResponse};
use crate::middleware::AuthUser;
use crate::models::{SanitizedUser, UpdateProfile};
use crate::utils::{Password, ValidatedJson};
use crate::AppState;

/// Current user and company
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_me(State(state): State<AppState>, AuthUser(claims): AuthUser) -> Result<Json<MeResponse>, AppError> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;
    let (user, company) = state.accounts.me(user_id).await?;
    Ok(Json(MeResponse { user, company }))
}

/// Update name and phone
#[utoipa::path(
    put,
    path = "/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = SanitizedUser),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<SanitizedUser>, AppError> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;
    let input = UpdateProfile {
        first_name: non_blank(req.first_name),
        last_name: non_blank(req.last_name),
        phone: req.phone,
    };
    Ok(Json(state.accounts.update_profile(user_id, &input).await?))
}

/// Change password, confirming the current one
#[utoipa::path(
    post,
    path = "/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password is incorrect", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;
    state
        .accounts
        .change_password(
            user_id,
            &Password::new(req.current_password),
            &Password::new(req.new_password),
            client_ip(&headers),
        )
        .await?;
    Ok(Json(MessageResponse::new("Password changed")))
}
