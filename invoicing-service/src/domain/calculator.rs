//! Line and invoice amounts.
//!
//! Line values are computed once when a line is written and stored with it.
//! Invoice totals are sums of those stored values, never a recomputation from
//! quantity and price, so later rate changes do not rewrite history.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::error::InvoiceError;
use crate::models::LineItem;

pub const CURRENCY_DECIMAL_PLACES: u32 = 2;
pub const QUANTITY_DECIMAL_PLACES: u32 = 3;

/// Largest quantity a NUMERIC(12,3) column holds.
pub const MAX_QUANTITY: Decimal = fixed(999_999_999_999, 3);
/// Largest unit price a NUMERIC(12,2) column holds.
pub const MAX_UNIT_PRICE: Decimal = fixed(999_999_999_999, 2);
/// Largest line or invoice amount a NUMERIC(14,2) column holds.
pub const MAX_AMOUNT: Decimal = fixed(99_999_999_999_999, 2);

const fn fixed(units: u64, scale: u32) -> Decimal {
    Decimal::from_parts(units as u32, (units >> 32) as u32, 0, false, scale)
}

/// Round to cents, half away from zero.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Stored amounts of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub line_total: Decimal,
    pub line_tax: Decimal,
}

/// Invoice totals derived from its lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Number of decimal places `value` actually carries, ignoring trailing zeros.
pub fn decimal_places(value: Decimal) -> u32 {
    value.normalize().scale()
}

/// Net and tax amount of a line. Inputs are already validated as
/// non-negative; a product that does not fit a stored amount is rejected.
pub fn calculate_line(
    quantity: Decimal,
    unit_price: Decimal,
    tax_rate_percent: Decimal,
) -> Result<LineAmounts, InvoiceError> {
    let net = quantity
        .checked_mul(unit_price)
        .ok_or(InvoiceError::AmountOutOfRange)?;
    let line_total = round_currency(net);
    let line_tax = line_total
        .checked_mul(tax_rate_percent)
        .and_then(|tax| tax.checked_div(Decimal::ONE_HUNDRED))
        .map(round_currency)
        .ok_or(InvoiceError::AmountOutOfRange)?;
    ensure_amount_in_range(line_total + line_tax)?;
    Ok(LineAmounts {
        line_total,
        line_tax,
    })
}

pub fn ensure_amount_in_range(amount: Decimal) -> Result<(), InvoiceError> {
    if amount > MAX_AMOUNT {
        return Err(InvoiceError::AmountOutOfRange);
    }
    Ok(())
}

pub fn calculate_invoice_totals(items: &[LineItem]) -> InvoiceTotals {
    let subtotal: Decimal = items.iter().map(|item| item.line_total).sum();
    let tax_amount: Decimal = items.iter().map(|item| item.line_tax).sum();
    InvoiceTotals {
        subtotal,
        tax_amount,
        total: subtotal + tax_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn stored_line(line_total: Decimal, line_tax: Decimal) -> LineItem {
        LineItem {
            line_item_id: Uuid::new_v4(),
            invoice_id: Uuid::nil(),
            company_id: Uuid::nil(),
            product_id: None,
            description: "Konsultacija".to_string(),
            quantity: dec!(1),
            unit: "val.".to_string(),
            unit_price: line_total,
            tax_rate: 21,
            line_total,
            line_tax,
            position: 0,
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn two_units_at_fifty_with_standard_vat() {
        let amounts = calculate_line(dec!(2), dec!(50.00), dec!(21)).unwrap();
        assert_eq!(amounts.line_total, dec!(100.00));
        assert_eq!(amounts.line_tax, dec!(21.00));
    }

    #[test]
    fn rounds_half_up_to_cents() {
        assert_eq!(round_currency(dec!(0.125)), dec!(0.13));
        assert_eq!(round_currency(dec!(0.124)), dec!(0.12));
        assert_eq!(round_currency(dec!(2.675)), dec!(2.68));
    }

    #[test]
    fn tax_is_computed_from_rounded_net() {
        // 0.335 x 3 = 1.005 -> 1.01; 1.01 * 9% = 0.0909 -> 0.09
        let amounts = calculate_line(dec!(0.335), dec!(3), dec!(9)).unwrap();
        assert_eq!(amounts.line_total, dec!(1.01));
        assert_eq!(amounts.line_tax, dec!(0.09));
    }

    #[test]
    fn zero_rate_has_no_tax() {
        let amounts = calculate_line(dec!(1.5), dec!(19.99), dec!(0)).unwrap();
        assert_eq!(amounts.line_total, dec!(29.99));
        assert_eq!(amounts.line_tax, dec!(0.00));
    }

    #[test]
    fn column_limits_match_numeric_precision() {
        assert_eq!(MAX_QUANTITY, dec!(999999999.999));
        assert_eq!(MAX_UNIT_PRICE, dec!(9999999999.99));
        assert_eq!(MAX_AMOUNT, dec!(999999999999.99));
    }

    #[test]
    fn products_beyond_decimal_range_are_errors() {
        let huge = dec!(1000000000000000);
        assert_eq!(
            calculate_line(huge, huge, dec!(21)),
            Err(InvoiceError::AmountOutOfRange)
        );
    }

    #[test]
    fn line_that_does_not_fit_a_stored_amount_is_rejected() {
        // Both inputs fit their columns, the product does not.
        assert_eq!(
            calculate_line(MAX_QUANTITY, MAX_UNIT_PRICE, dec!(0)),
            Err(InvoiceError::AmountOutOfRange)
        );
        let amounts = calculate_line(dec!(1000), dec!(826446280.99), dec!(21)).unwrap();
        assert_eq!(amounts.line_total, dec!(826446280990.00));
        assert_eq!(amounts.line_tax, dec!(173553719007.90));
        assert!(calculate_line(dec!(1000), dec!(826446281.00), dec!(21)).is_err());
    }

    #[test]
    fn decimal_places_ignore_trailing_zeros() {
        assert_eq!(decimal_places(dec!(33.330)), 2);
        assert_eq!(decimal_places(dec!(33.333)), 3);
        assert_eq!(decimal_places(dec!(100)), 0);
    }

    #[test]
    fn totals_sum_two_lines() {
        let items = vec![
            stored_line(dec!(100.00), dec!(21.00)),
            stored_line(dec!(100.00), dec!(21.00)),
        ];
        let totals = calculate_invoice_totals(&items);
        assert_eq!(totals.subtotal, dec!(200.00));
        assert_eq!(totals.tax_amount, dec!(42.00));
        assert_eq!(totals.total, dec!(242.00));
    }

    #[test]
    fn totals_use_stored_values_not_rates() {
        // Stored tax differs from what the current rate would give.
        let mut item = stored_line(dec!(100.00), dec!(18.00));
        item.tax_rate = 21;
        let totals = calculate_invoice_totals(&[item]);
        assert_eq!(totals.tax_amount, dec!(18.00));
        assert_eq!(totals.total, dec!(118.00));
    }

    #[test]
    fn recomputing_totals_is_idempotent() {
        let items = vec![
            stored_line(dec!(10.10), dec!(2.12)),
            stored_line(dec!(0.99), dec!(0.05)),
        ];
        assert_eq!(calculate_invoice_totals(&items), calculate_invoice_totals(&items));
    }

    #[test]
    fn empty_invoice_totals_are_zero() {
        assert_eq!(calculate_invoice_totals(&[]), InvoiceTotals::default());
    }
}
