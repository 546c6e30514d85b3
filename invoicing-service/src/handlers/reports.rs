use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use super::attachment;
use crate::dtos::reports::{DateRangeQuery, QuarterQuery};
use crate::dtos::ErrorResponse;
use crate::middleware::CurrentActor;
use crate::services::reports::{ClientSummary, RevenueReport, VatReport};
use crate::AppState;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Paid revenue by month and by client
#[utoipa::path(
    get,
    path = "/reports/revenue",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Revenue report", body = RevenueReport),
        (status = 403, description = "Plan does not include reports", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn revenue(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<RevenueReport>, AppError> {
    let report = state
        .reports
        .revenue(&actor.company, query.from, query.to)
        .await?;
    Ok(Json(report))
}

/// VAT issued in a quarter, broken down by rate
#[utoipa::path(
    get,
    path = "/reports/vat",
    params(QuarterQuery),
    responses(
        (status = 200, description = "VAT report", body = VatReport),
        (status = 400, description = "Invalid quarter", body = ErrorResponse),
        (status = 403, description = "Plan does not include reports", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn vat(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<QuarterQuery>,
) -> Result<Json<VatReport>, AppError> {
    let (year, quarter) = query.resolve();
    Ok(Json(state.reports.vat(&actor.company, year, quarter).await?))
}

/// Invoiced, paid and outstanding totals per client
#[utoipa::path(
    get,
    path = "/reports/clients",
    responses(
        (status = 200, description = "Client summary", body = Vec<ClientSummary>),
        (status = 403, description = "Plan does not include reports", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn clients(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<ClientSummary>>, AppError> {
    Ok(Json(state.reports.clients(&actor.company).await?))
}

/// Invoice register as CSV
#[utoipa::path(
    get,
    path = "/reports/export/invoices",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv"),
        (status = 403, description = "Plan does not include reports", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn export_invoices(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<DateRangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let csv = state
        .reports
        .export_invoices(&actor.company, query.from, query.to)
        .await?;
    let filename = format!("saskaitos_{}.csv", Utc::now().format("%Y%m%d"));
    Ok((attachment(CSV_CONTENT_TYPE, &filename), csv))
}

/// Quarterly VAT register as CSV, one row per line item
#[utoipa::path(
    get,
    path = "/reports/export/vat",
    params(QuarterQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv"),
        (status = 403, description = "Plan does not include reports", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn export_vat(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<QuarterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (year, quarter) = query.resolve();
    let csv = state
        .reports
        .export_vat(&actor.company, year, quarter)
        .await?;
    let filename = format!("pvm_ataskaita_{}Q{}.csv", year, quarter);
    Ok((attachment(CSV_CONTENT_TYPE, &filename), csv))
}
