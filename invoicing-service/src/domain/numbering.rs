//! Invoice number rendering.
//!
//! Reserving a counter value is a store operation (`next_invoice_number`)
//! so that the read and increment happen under one row lock.

/// Width of the zero-padded counter.
pub const COUNTER_WIDTH: usize = 6;

/// Render `{prefix}{counter:06}`.
pub fn format_invoice_number(prefix: &str, counter: i64) -> String {
    format!("{prefix}{counter:0width$}", width = COUNTER_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_number_of_default_prefix() {
        assert_eq!(format_invoice_number("SF", 1), "SF000001");
    }

    #[test]
    fn consecutive_numbers_sort_in_issue_order() {
        let numbers: Vec<String> = (1..=3).map(|n| format_invoice_number("SF", n)).collect();
        assert_eq!(numbers, vec!["SF000001", "SF000002", "SF000003"]);
        let mut sorted = numbers.clone();
        sorted.sort();
        assert_eq!(sorted, numbers);
    }

    #[test]
    fn counter_wider_than_padding_is_not_truncated() {
        assert_eq!(format_invoice_number("INV-", 1234567), "INV-1234567");
    }

    #[test]
    fn empty_prefix() {
        assert_eq!(format_invoice_number("", 42), "000042");
    }
}
