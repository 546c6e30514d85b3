//! VAT rates accepted on line items and products.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The fixed set of VAT percentages an item may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaxRate {
    Standard,
    Reduced,
    SuperReduced,
    Zero,
}

impl TaxRate {
    pub const ALL: [TaxRate; 4] = [
        TaxRate::Standard,
        TaxRate::Reduced,
        TaxRate::SuperReduced,
        TaxRate::Zero,
    ];

    pub fn percent(&self) -> i32 {
        match self {
            TaxRate::Standard => 21,
            TaxRate::Reduced => 9,
            TaxRate::SuperReduced => 5,
            TaxRate::Zero => 0,
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.percent())
    }

    pub fn from_percent(percent: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.percent() == percent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxRate::Standard => "standard",
            TaxRate::Reduced => "reduced",
            TaxRate::SuperReduced => "super_reduced",
            TaxRate::Zero => "zero",
        }
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_percentages_round_trip() {
        for rate in TaxRate::ALL {
            assert_eq!(TaxRate::from_percent(rate.percent()), Some(rate));
        }
    }

    #[test]
    fn unknown_percentage_is_rejected() {
        assert_eq!(TaxRate::from_percent(20), None);
        assert_eq!(TaxRate::from_percent(-21), None);
    }

    #[test]
    fn default_is_standard_rate() {
        assert_eq!(TaxRate::default().percent(), 21);
    }
}
