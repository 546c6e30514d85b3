use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::non_blank;
use crate::models::{Invoice, InvoiceStatus, ListInvoicesFilter, UpdateInvoice, UpdateLineItem};
use crate::services::{ItemInput, NewInvoice, PaymentInput};

pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListInvoicesQuery {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl From<ListInvoicesQuery> for ListInvoicesFilter {
    fn from(q: ListInvoicesQuery) -> Self {
        let defaults = ListInvoicesFilter::default();
        ListInvoicesFilter {
            status: q.status,
            client_id: q.client_id,
            date_from: q.date_from,
            date_to: q.date_to,
            page: q.page.unwrap_or(defaults.page).max(1),
            per_page: q.per_page.unwrap_or(defaults.per_page).clamp(1, MAX_PER_PAGE),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LineItemRequest {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 500))]
    #[schema(example = "Konsultacija")]
    pub description: Option<String>,
    #[schema(value_type = String, example = "2")]
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    #[schema(value_type = Option<String>, example = "50.00")]
    pub unit_price: Option<Decimal>,
    #[schema(example = 21)]
    pub tax_rate: Option<i32>,
}

impl From<LineItemRequest> for ItemInput {
    fn from(req: LineItemRequest) -> Self {
        ItemInput {
            product_id: req.product_id,
            description: non_blank(req.description),
            quantity: req.quantity,
            unit: non_blank(req.unit),
            unit_price: req.unit_price,
            tax_rate: req.tax_rate,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,
    pub invoice_date: Option<NaiveDate>,
    /// Defaults to the invoice date plus the company's payment terms.
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 2000))]
    pub internal_notes: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<LineItemRequest>,
}

impl From<CreateInvoiceRequest> for NewInvoice {
    fn from(req: CreateInvoiceRequest) -> Self {
        NewInvoice {
            client_id: req.client_id,
            invoice_date: req.invoice_date,
            due_date: req.due_date,
            notes: non_blank(req.notes),
            internal_notes: non_blank(req.internal_notes),
            items: req.items.into_iter().map(ItemInput::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateInvoiceRequest {
    pub client_id: Option<Uuid>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 2000))]
    pub internal_notes: Option<String>,
}

impl From<UpdateInvoiceRequest> for UpdateInvoice {
    fn from(req: UpdateInvoiceRequest) -> Self {
        UpdateInvoice {
            client_id: req.client_id,
            invoice_date: req.invoice_date,
            due_date: req.due_date,
            notes: req.notes,
            internal_notes: req.internal_notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLineItemRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub quantity: Option<Decimal>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    #[schema(value_type = Option<String>)]
    pub unit_price: Option<Decimal>,
    pub tax_rate: Option<i32>,
}

impl From<UpdateLineItemRequest> for UpdateLineItem {
    fn from(req: UpdateLineItemRequest) -> Self {
        UpdateLineItem {
            description: non_blank(req.description),
            quantity: req.quantity,
            unit: non_blank(req.unit),
            unit_price: req.unit_price,
            tax_rate: req.tax_rate,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentRequest {
    /// Defaults to today.
    pub paid_date: Option<NaiveDate>,
    /// Defaults to the invoice total.
    #[schema(value_type = Option<String>)]
    pub paid_amount: Option<Decimal>,
}

impl From<RecordPaymentRequest> for PaymentInput {
    fn from(req: RecordPaymentRequest) -> Self {
        PaymentInput {
            paid_date: req.paid_date,
            paid_amount: req.paid_amount,
        }
    }
}
