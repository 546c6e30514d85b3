use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;

use crate::dtos::reports::ActivityQuery;
use crate::middleware::AuthUser;
use crate::models::ActivityLog;
use crate::AppState;

/// The caller's most recent actions
#[utoipa::path(
    get,
    path = "/activity",
    params(ActivityQuery),
    responses((status = 200, description = "Activity log", body = Vec<ActivityLog>)),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn list_activity(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, AppError> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;
    Ok(Json(state.store.list_activity(user_id, query.limit()).await?))
}
