use axum::{extract::State, Json};
use service_core::error::AppError;
use tracing::info;

use crate::domain::SubscriptionPlan;
use crate::dtos::company::{PlanResponse, SubscriptionResponse, UpdateSubscriptionRequest};
use crate::dtos::ErrorResponse;
use crate::middleware::CurrentActor;
use crate::services::activity;
use crate::AppState;

/// Available subscription plans and their limits
#[utoipa::path(
    get,
    path = "/billing/plans",
    responses((status = 200, description = "Plans", body = Vec<PlanResponse>)),
    tag = "Billing"
)]
pub async fn list_plans() -> Json<Vec<PlanResponse>> {
    Json(SubscriptionPlan::ALL.into_iter().map(PlanResponse::from).collect())
}

/// Current plan with usage against its limits
#[utoipa::path(
    get,
    path = "/billing/subscription",
    responses(
        (status = 200, description = "Subscription", body = SubscriptionResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Billing"
)]
pub async fn get_subscription(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let usage = state.entitlements.usage(&actor.company).await?;
    Ok(Json(SubscriptionResponse {
        plan: actor.company.plan().into(),
        usage,
    }))
}

/// Switch plan. Payment collection happens outside this service.
#[utoipa::path(
    put,
    path = "/billing/subscription",
    request_body = UpdateSubscriptionRequest,
    responses(
        (status = 200, description = "Plan changed", body = SubscriptionResponse),
        (status = 422, description = "Unknown plan")
    ),
    security(("bearer_auth" = [])),
    tag = "Billing"
)]
pub async fn update_subscription(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<UpdateSubscriptionRequest>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let previous = actor.company.plan();
    let company = state
        .store
        .set_subscription_plan(actor.company_id(), req.plan)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

    info!(company_id = %company.company_id, from = ?previous, to = ?req.plan, "Subscription plan changed");
    activity::record(
        state.store.as_ref(),
        actor
            .activity("subscription_change")
            .entity("company", company.company_id)
            .details(format!("{} -> {}", previous.as_str(), req.plan.as_str())),
    )
    .await;

    let usage = state.entitlements.usage(&company).await?;
    Ok(Json(SubscriptionResponse {
        plan: company.plan().into(),
        usage,
    }))
}
