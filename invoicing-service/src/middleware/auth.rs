use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;
use service_core::middleware::tracing::RequestContext;

use crate::dtos::ErrorResponse;
use crate::services::{AccessTokenClaims, Actor};
use crate::AppState;

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Middleware to require a valid bearer token
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("Missing or invalid Authorization header"))?;

    let claims = state.jwt.validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        unauthorized("Invalid or expired token")
    })?;

    // Store claims in request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor to easily get claims in handlers
pub struct AuthUser(pub AccessTokenClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<AccessTokenClaims>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Auth claims missing from request extensions".to_string(),
            }),
        ))?;

        Ok(AuthUser(claims.clone()))
    }
}

/// The authenticated user with their company loaded.
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let user_id = claims
            .user_id()
            .map_err(|e| AppError::Unauthorized(e).into_response())?;

        let company = state
            .store
            .get_company_for_user(user_id)
            .await
            .map_err(IntoResponse::into_response)?
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Account no longer exists")).into_response()
            })?;

        let ip = parts
            .extensions
            .get::<RequestContext>()
            .and_then(|ctx| ctx.client_ip.clone());

        Ok(CurrentActor(Actor {
            user_id,
            company,
            ip,
        }))
    }
}
