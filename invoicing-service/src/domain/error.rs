//! Domain errors raised by invoicing rules.

use rust_decimal::Decimal;
use service_core::error::AppError;
use thiserror::Error;

use super::entitlement::{ResourceKind, SubscriptionPlan};
use super::lifecycle::InvoiceEvent;
use crate::models::InvoiceStatus;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvoiceError {
    #[error("Cannot {event} an invoice that is {from}")]
    IllegalTransition {
        from: InvoiceStatus,
        event: InvoiceEvent,
    },

    #[error("Cannot send an invoice without line items")]
    EmptyInvoice,

    #[error("Limit reached: your plan allows no more {0}. Upgrade to create more")]
    LimitReached(ResourceKind),

    #[error("Reports are not included in the {0} plan")]
    ReportsNotIncluded(SubscriptionPlan),

    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Unit price cannot be negative")]
    InvalidUnitPrice,

    #[error("Unsupported tax rate: {0}%")]
    InvalidTaxRate(i32),

    #[error("Quantity cannot exceed {max}")]
    QuantityTooLarge { max: Decimal },

    #[error("Unit price cannot exceed {max}")]
    UnitPriceTooLarge { max: Decimal },

    #[error("{field} allows at most {places} decimal places")]
    TooManyDecimals { field: &'static str, places: u32 },

    #[error("Amount exceeds the largest supported value")]
    AmountOutOfRange,

    #[error("Invoice counter cannot be lowered from {current} to {requested}")]
    CounterDecrease { current: i64, requested: i64 },
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::LimitReached(_) => AppError::PaymentRequired(anyhow::anyhow!(err)),
            InvoiceError::ReportsNotIncluded(_) => AppError::Forbidden(anyhow::anyhow!(err)),
            _ => AppError::BadRequest(anyhow::anyhow!(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn illegal_transition_names_state_and_event() {
        let err = InvoiceError::IllegalTransition {
            from: InvoiceStatus::Paid,
            event: InvoiceEvent::Cancel,
        };
        assert_eq!(err.to_string(), "Cannot cancel an invoice that is paid");
    }

    #[test]
    fn limit_reached_maps_to_payment_required() {
        let app: AppError = InvoiceError::LimitReached(ResourceKind::Invoice).into();
        assert_eq!(app.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert!(app.to_string().contains("invoices"));
    }

    #[test]
    fn rule_violations_map_to_bad_request() {
        let app: AppError = InvoiceError::EmptyInvoice.into();
        assert_eq!(app.status_code(), StatusCode::BAD_REQUEST);

        let app: AppError = InvoiceError::ReportsNotIncluded(SubscriptionPlan::Free).into();
        assert_eq!(app.status_code(), StatusCode::FORBIDDEN);

        let app: AppError = InvoiceError::AmountOutOfRange.into();
        assert_eq!(app.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn precision_error_names_the_field() {
        let err = InvoiceError::TooManyDecimals {
            field: "Unit price",
            places: 2,
        };
        assert_eq!(err.to_string(), "Unit price allows at most 2 decimal places");
    }
}
