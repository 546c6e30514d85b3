//! Core invoicing rules: numbering, amounts, status lifecycle and plan limits.
//!
//! Everything here is synchronous and free of I/O. Persistence applies the
//! results under its own transactional guarantees.

pub mod calculator;
pub mod entitlement;
pub mod error;
pub mod lifecycle;
pub mod numbering;

pub use calculator::{
    calculate_invoice_totals, calculate_line, decimal_places, ensure_amount_in_range, round_currency,
    InvoiceTotals, LineAmounts, CURRENCY_DECIMAL_PLACES, MAX_QUANTITY, MAX_UNIT_PRICE,
    QUANTITY_DECIMAL_PLACES,
};
pub use entitlement::{is_within_limit, PlanLimits, ResourceKind, SubscriptionPlan, UNLIMITED};
pub use error::InvoiceError;
pub use lifecycle::{effective_status, ensure_editable, payment_reference, transition, InvoiceEvent};
pub use numbering::format_invoice_number;
