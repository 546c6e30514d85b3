//! Line item model for invoicing-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::calculator::{calculate_line, LineAmounts};
use crate::domain::InvoiceError;

/// Line item on an invoice. `line_total` and `line_tax` are cached derived
/// values, refreshed whenever the line is written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LineItem {
    pub line_item_id: Uuid,
    pub invoice_id: Uuid,
    pub company_id: Uuid,
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    #[schema(example = "vnt.")]
    pub unit: String,
    pub unit_price: Decimal,
    #[schema(example = 21)]
    pub tax_rate: i32,
    pub line_total: Decimal,
    pub line_tax: Decimal,
    pub position: i32,
    pub created_utc: DateTime<Utc>,
}

/// A line ready to be stored, amounts already calculated.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub tax_rate: i32,
    pub line_total: Decimal,
    pub line_tax: Decimal,
}

impl NewLineItem {
    pub fn new(
        product_id: Option<Uuid>,
        description: String,
        quantity: Decimal,
        unit: String,
        unit_price: Decimal,
        tax_rate: i32,
    ) -> Result<Self, InvoiceError> {
        let LineAmounts {
            line_total,
            line_tax,
        } = calculate_line(quantity, unit_price, Decimal::from(tax_rate))?;
        Ok(Self {
            product_id,
            description,
            quantity,
            unit,
            unit_price,
            tax_rate,
            line_total,
            line_tax,
        })
    }

    /// Copy of an existing line, amounts recalculated.
    pub fn from_existing(item: &LineItem) -> Result<Self, InvoiceError> {
        Self::new(
            item.product_id,
            item.description.clone(),
            item.quantity,
            item.unit.clone(),
            item.unit_price,
            item.tax_rate,
        )
    }
}

/// Partial update of a line item.
#[derive(Debug, Clone, Default)]
pub struct UpdateLineItem {
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub unit_price: Option<Decimal>,
    pub tax_rate: Option<i32>,
}

impl UpdateLineItem {
    /// `item` with this update's fields merged in. Amounts are left stale.
    pub fn merged(&self, item: &LineItem) -> LineItem {
        let mut merged = item.clone();
        if let Some(description) = &self.description {
            merged.description = description.clone();
        }
        if let Some(quantity) = self.quantity {
            merged.quantity = quantity;
        }
        if let Some(unit) = &self.unit {
            merged.unit = unit.clone();
        }
        if let Some(unit_price) = self.unit_price {
            merged.unit_price = unit_price;
        }
        if let Some(tax_rate) = self.tax_rate {
            merged.tax_rate = tax_rate;
        }
        merged
    }

    /// Merge onto `item` and recalculate its amounts. `item` is untouched
    /// when the merged line cannot be priced.
    pub fn apply_to(&self, item: &mut LineItem) -> Result<(), InvoiceError> {
        let mut merged = self.merged(item);
        let amounts = calculate_line(merged.quantity, merged.unit_price, Decimal::from(merged.tax_rate))?;
        merged.line_total = amounts.line_total;
        merged.line_tax = amounts.line_tax;
        *item = merged;
        Ok(())
    }
}
