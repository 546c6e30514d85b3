use axum::{extract::State, Json};
use service_core::error::AppError;
use tracing::info;

use crate::dtos::company::{InvoiceSettingsRequest, UpdateCompanyRequest};
use crate::dtos::ErrorResponse;
use crate::middleware::CurrentActor;
use crate::models::{Company, UpdateCompany};
use crate::services::{activity, Actor};
use crate::utils::ValidatedJson;
use crate::AppState;

async fn apply(state: &AppState, actor: &Actor, input: UpdateCompany, action: &str) -> Result<Company, AppError> {
    let company = state
        .store
        .update_company(actor.company_id(), &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

    info!(company_id = %company.company_id, action, "Company updated");
    activity::record(
        state.store.as_ref(),
        actor.activity(action).entity("company", company.company_id),
    )
    .await;
    Ok(company)
}

/// The caller's company
#[utoipa::path(
    get,
    path = "/company",
    responses(
        (status = 200, description = "Company profile", body = Company),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn get_company(CurrentActor(actor): CurrentActor) -> Json<Company> {
    Json(actor.company)
}

/// Update company details shown on invoices
#[utoipa::path(
    put,
    path = "/company",
    request_body = UpdateCompanyRequest,
    responses(
        (status = 200, description = "Company updated", body = Company),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn update_company(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ValidatedJson(req): ValidatedJson<UpdateCompanyRequest>,
) -> Result<Json<Company>, AppError> {
    let company = apply(&state, &actor, req.into(), "company_update").await?;
    Ok(Json(company))
}

/// Update numbering, payment terms and invoice appearance
#[utoipa::path(
    put,
    path = "/company/invoice-settings",
    request_body = InvoiceSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = Company),
        (status = 400, description = "Counter cannot move backwards", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn update_invoice_settings(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ValidatedJson(req): ValidatedJson<InvoiceSettingsRequest>,
) -> Result<Json<Company>, AppError> {
    let company = apply(&state, &actor, req.into(), "invoice_settings_update").await?;
    Ok(Json(company))
}
