use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use super::attachment;
use crate::dtos::invoices::{
    CreateInvoiceRequest, InvoiceListResponse, LineItemRequest, ListInvoicesQuery,
    RecordPaymentRequest, UpdateInvoiceRequest, UpdateLineItemRequest,
};
use crate::dtos::{ErrorResponse, MessageResponse};
use crate::middleware::CurrentActor;
use crate::models::{Invoice, LineItem, ListInvoicesFilter};
use crate::services::{InvoiceDetail, ItemInput};
use crate::utils::ValidatedJson;
use crate::AppState;

/// List invoices, newest first
#[utoipa::path(
    get,
    path = "/invoices",
    params(ListInvoicesQuery),
    responses((status = 200, description = "Invoices page", body = InvoiceListResponse)),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<InvoiceListResponse>, AppError> {
    let filter = ListInvoicesFilter::from(query);
    let (invoices, total) = state.invoices.list(actor.company_id(), &filter).await?;
    Ok(Json(InvoiceListResponse {
        invoices,
        total,
        page: filter.page,
        per_page: filter.per_page,
    }))
}

/// Create a draft invoice with the next number
#[utoipa::path(
    post,
    path = "/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created", body = InvoiceDetail),
        (status = 400, description = "Invalid invoice", body = ErrorResponse),
        (status = 402, description = "Monthly invoice limit reached", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ValidatedJson(req): ValidatedJson<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.invoices.create(&actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// An invoice with its client and line items
#[utoipa::path(
    get,
    path = "/invoices/{invoice_id}",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice", body = InvoiceDetail),
        (status = 404, description = "Invoice not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceDetail>, AppError> {
    Ok(Json(state.invoices.get(actor.company_id(), invoice_id).await?))
}

/// Update a draft invoice's header
#[utoipa::path(
    put,
    path = "/invoices/{invoice_id}",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    request_body = UpdateInvoiceRequest,
    responses(
        (status = 200, description = "Invoice updated", body = InvoiceDetail),
        (status = 400, description = "Invoice is not a draft", body = ErrorResponse),
        (status = 404, description = "Invoice not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceDetail>, AppError> {
    Ok(Json(state.invoices.update(&actor, invoice_id, req.into()).await?))
}

#[utoipa::path(
    post,
    path = "/invoices/{invoice_id}/items",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    request_body = LineItemRequest,
    responses(
        (status = 201, description = "Line item added", body = LineItem),
        (status = 400, description = "Invoice is not a draft", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn add_line_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<LineItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item = state
        .invoices
        .add_item(&actor, invoice_id, &ItemInput::from(req))
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    put,
    path = "/invoices/{invoice_id}/items/{item_id}",
    params(
        ("invoice_id" = Uuid, Path, description = "Invoice ID"),
        ("item_id" = Uuid, Path, description = "Line item ID")
    ),
    request_body = UpdateLineItemRequest,
    responses(
        (status = 200, description = "Line item updated", body = LineItem),
        (status = 400, description = "Invoice is not a draft", body = ErrorResponse),
        (status = 404, description = "Line item not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn update_line_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((invoice_id, item_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdateLineItemRequest>,
) -> Result<Json<LineItem>, AppError> {
    let item = state
        .invoices
        .update_item(&actor, invoice_id, item_id, &req.into())
        .await?;
    Ok(Json(item))
}

#[utoipa::path(
    delete,
    path = "/invoices/{invoice_id}/items/{item_id}",
    params(
        ("invoice_id" = Uuid, Path, description = "Invoice ID"),
        ("item_id" = Uuid, Path, description = "Line item ID")
    ),
    responses(
        (status = 204, description = "Line item removed"),
        (status = 400, description = "Invoice is not a draft", body = ErrorResponse),
        (status = 404, description = "Line item not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn remove_line_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((invoice_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.invoices.remove_item(&actor, invoice_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Email the invoice to the client and mark it sent
#[utoipa::path(
    post,
    path = "/invoices/{invoice_id}/send",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice sent", body = InvoiceDetail),
        (status = 400, description = "Invoice cannot be sent", body = ErrorResponse),
        (status = 500, description = "Email delivery failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn send_invoice(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceDetail>, AppError> {
    Ok(Json(state.invoices.send(&actor, invoice_id).await?))
}

/// Mark a sent or overdue invoice as paid
#[utoipa::path(
    post,
    path = "/invoices/{invoice_id}/pay",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = Invoice),
        (status = 400, description = "Invoice cannot be paid", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(invoice_id): Path<Uuid>,
    body: Option<Json<RecordPaymentRequest>>,
) -> Result<Json<Invoice>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    Ok(Json(
        state
            .invoices
            .record_payment(&actor, invoice_id, req.into())
            .await?,
    ))
}

/// Cancel an invoice that has not been paid
#[utoipa::path(
    post,
    path = "/invoices/{invoice_id}/cancel",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice cancelled", body = Invoice),
        (status = 400, description = "Paid invoices cannot be cancelled", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn cancel_invoice(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(state.invoices.cancel(&actor, invoice_id).await?))
}

/// Copy an invoice into a new draft dated today
#[utoipa::path(
    post,
    path = "/invoices/{invoice_id}/duplicate",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 201, description = "Draft created", body = InvoiceDetail),
        (status = 402, description = "Monthly invoice limit reached", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn duplicate_invoice(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = state.invoices.duplicate(&actor, invoice_id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Email a payment reminder
#[utoipa::path(
    post,
    path = "/invoices/{invoice_id}/remind",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Reminder sent", body = MessageResponse),
        (status = 400, description = "Invoice is not outstanding", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn remind_invoice(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.invoices.remind(&actor, invoice_id).await?;
    Ok(Json(MessageResponse::new("Reminder sent")))
}

/// Download the invoice as PDF
#[utoipa::path(
    get,
    path = "/invoices/{invoice_id}/pdf",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Invoice not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn invoice_pdf(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (filename, bytes) = state.invoices.render_pdf(&actor.company, invoice_id).await?;
    Ok((attachment("application/pdf", &filename), bytes))
}
