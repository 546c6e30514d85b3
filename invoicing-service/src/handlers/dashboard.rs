use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::middleware::CurrentActor;
use crate::services::reports::Dashboard;
use crate::AppState;

/// Headline numbers, recent and overdue invoices, and a six month revenue chart
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Dashboard", body = Dashboard)),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(
        state
            .reports
            .dashboard(actor.user_id, &actor.company)
            .await?,
    ))
}
