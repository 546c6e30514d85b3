//! Invoice status transitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::InvoiceError;
use crate::models::InvoiceStatus;

/// Prefix of bank transfer references.
pub const PAYMENT_REFERENCE_PREFIX: &str = "SF";

/// Something that happens to an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceEvent {
    Send,
    ObservePastDue,
    RecordPayment,
    Cancel,
    EditLineItems,
}

impl InvoiceEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceEvent::Send => "send",
            InvoiceEvent::ObservePastDue => "mark overdue",
            InvoiceEvent::RecordPayment => "record payment on",
            InvoiceEvent::Cancel => "cancel",
            InvoiceEvent::EditLineItems => "edit",
        }
    }
}

impl fmt::Display for InvoiceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status an invoice moves to when `event` happens in `from`.
///
/// Editing keeps the invoice in draft, so a legal edit returns `Draft`.
pub fn transition(from: InvoiceStatus, event: InvoiceEvent) -> Result<InvoiceStatus, InvoiceError> {
    use InvoiceEvent::*;
    use InvoiceStatus::*;

    match (from, event) {
        (Draft, Send) => Ok(Sent),
        (Sent, ObservePastDue) => Ok(Overdue),
        (Overdue, ObservePastDue) => Ok(Overdue),
        (Sent | Overdue, RecordPayment) => Ok(Paid),
        (Draft | Sent | Overdue, Cancel) => Ok(Cancelled),
        (Draft, EditLineItems) => Ok(Draft),
        (Sent | Paid | Overdue | Cancelled, Send)
        | (Draft | Paid | Cancelled, ObservePastDue)
        | (Draft | Paid | Cancelled, RecordPayment)
        | (Paid | Cancelled, Cancel)
        | (Sent | Paid | Overdue | Cancelled, EditLineItems) => {
            Err(InvoiceError::IllegalTransition { from, event })
        }
    }
}

/// Fails unless the invoice's content may still change.
pub fn ensure_editable(status: InvoiceStatus) -> Result<(), InvoiceError> {
    transition(status, InvoiceEvent::EditLineItems).map(|_| ())
}

/// Bank transfer reference derived from the invoice id. Stable for the life
/// of the invoice and fixed width.
pub fn payment_reference(invoice_id: Uuid) -> String {
    format!(
        "{PAYMENT_REFERENCE_PREFIX}{}",
        invoice_id.simple().to_string().to_uppercase()
    )
}

/// Status as observed on `today`: a sent invoice past its due date reads as
/// overdue even before the store has promoted it.
pub fn effective_status(status: InvoiceStatus, due_date: NaiveDate, today: NaiveDate) -> InvoiceStatus {
    match status {
        InvoiceStatus::Sent if due_date < today => InvoiceStatus::Overdue,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InvoiceEvent::*;
    use InvoiceStatus::*;

    const STATUSES: [InvoiceStatus; 5] = [Draft, Sent, Paid, Overdue, Cancelled];
    const EVENTS: [InvoiceEvent; 5] = [Send, ObservePastDue, RecordPayment, Cancel, EditLineItems];

    #[test]
    fn allowed_transitions() {
        assert_eq!(transition(Draft, Send), Ok(Sent));
        assert_eq!(transition(Sent, ObservePastDue), Ok(Overdue));
        assert_eq!(transition(Sent, RecordPayment), Ok(Paid));
        assert_eq!(transition(Overdue, RecordPayment), Ok(Paid));
        assert_eq!(transition(Draft, Cancel), Ok(Cancelled));
        assert_eq!(transition(Sent, Cancel), Ok(Cancelled));
        assert_eq!(transition(Overdue, Cancel), Ok(Cancelled));
        assert_eq!(transition(Draft, EditLineItems), Ok(Draft));
    }

    #[test]
    fn paid_invoice_cannot_be_cancelled() {
        assert_eq!(
            transition(Paid, Cancel),
            Err(InvoiceError::IllegalTransition {
                from: Paid,
                event: Cancel
            })
        );
    }

    #[test]
    fn only_drafts_are_editable() {
        for status in STATUSES {
            let result = transition(status, EditLineItems);
            assert_eq!(result.is_ok(), status == Draft, "{status}");
        }
    }

    #[test]
    fn observing_past_due_is_idempotent() {
        let once = transition(Sent, ObservePastDue).unwrap();
        assert_eq!(transition(once, ObservePastDue), Ok(Overdue));
    }

    #[test]
    fn terminal_states_accept_nothing_but_idempotent_reads() {
        for event in EVENTS {
            assert!(transition(Paid, event).is_err(), "paid {event}");
            assert!(transition(Cancelled, event).is_err(), "cancelled {event}");
        }
    }

    #[test]
    fn draft_cannot_be_paid_directly() {
        assert!(transition(Draft, RecordPayment).is_err());
    }

    #[test]
    fn payment_reference_is_deterministic_and_fixed_width() {
        let id = Uuid::parse_str("0b5a0c1e-7d2f-4c55-9a1e-3f0a9b8c7d6e").unwrap();
        let reference = payment_reference(id);
        assert_eq!(reference, "SF0B5A0C1E7D2F4C559A1E3F0A9B8C7D6E");
        assert_eq!(reference, payment_reference(id));
        assert_eq!(payment_reference(Uuid::new_v4()).len(), reference.len());
    }

    #[test]
    fn sent_past_due_reads_as_overdue() {
        let due = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let before = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();

        assert_eq!(effective_status(Sent, due, before), Sent);
        assert_eq!(effective_status(Sent, due, after), Overdue);
        assert_eq!(effective_status(Paid, due, after), Paid);
        assert_eq!(effective_status(Draft, due, after), Draft);
    }
}
