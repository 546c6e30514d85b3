//! Invoice model for invoicing-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use super::line_item::NewLineItem;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(InvoiceStatus::Draft),
            "sent" => Some(InvoiceStatus::Sent),
            "paid" => Some(InvoiceStatus::Paid),
            "overdue" => Some(InvoiceStatus::Overdue),
            "cancelled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }

    /// Sent or overdue: issued to the client and awaiting payment.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Overdue)
    }

    /// Statuses that count towards VAT reporting.
    pub fn is_issued(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::Paid | InvoiceStatus::Overdue
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invoice document.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub client_id: Uuid,
    #[schema(example = "SF000001")]
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    #[schema(example = "draft")]
    pub status: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
    pub payment_reference: Option<String>,
    pub paid_date: Option<NaiveDate>,
    pub paid_amount: Option<Decimal>,
    pub sent_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Invoice {
    /// Stored status. Rows only ever hold the five known values.
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::parse(&self.status).unwrap_or(InvoiceStatus::Draft)
    }
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: i64,
    pub per_page: i64,
}

impl Default for ListInvoicesFilter {
    fn default() -> Self {
        Self {
            status: None,
            client_id: None,
            date_from: None,
            date_to: None,
            page: 1,
            per_page: 20,
        }
    }
}

impl ListInvoicesFilter {
    /// Every invoice of the company, for reports and dashboards.
    pub fn all() -> Self {
        Self {
            per_page: i64::MAX,
            ..Self::default()
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.per_page)
    }
}

/// Input for creating an invoice. The number is assigned by the store.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
    /// Items inserted in the same transaction (used by duplication).
    pub items: Vec<NewLineItem>,
}

/// Input for updating a draft invoice.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub client_id: Option<Uuid>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
}

/// A status change computed by the lifecycle, applied by the store only if
/// the invoice is still in `from`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub from: InvoiceStatus,
    pub to: InvoiceStatus,
    pub sent_utc: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub paid_date: Option<NaiveDate>,
    pub paid_amount: Option<Decimal>,
}

impl StatusChange {
    pub fn new(from: InvoiceStatus, to: InvoiceStatus) -> Self {
        Self {
            from,
            to,
            sent_utc: None,
            payment_reference: None,
            paid_date: None,
            paid_amount: None,
        }
    }
}
