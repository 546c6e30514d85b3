//! Product and service catalogue model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_UNIT: &str = "vnt.";

/// Whether a catalogue entry is goods or a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Product,
    Service,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Product => "product",
            ProductType::Service => "service",
        }
    }
}

/// Catalogue entry that can be copied onto line items.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub product_id: Uuid,
    pub company_id: Uuid,
    #[schema(example = "Konsultacija")]
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    #[schema(example = "service")]
    pub product_type: String,
    pub unit_price: Decimal,
    #[schema(example = "val.")]
    pub unit: String,
    #[schema(example = 21)]
    pub tax_rate: i32,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub product_type: ProductType,
    pub unit_price: Decimal,
    pub unit: String,
    pub tax_rate: i32,
}

/// Partial update of a product.
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub product_type: Option<ProductType>,
    pub unit_price: Option<Decimal>,
    pub unit: Option<String>,
    pub tax_rate: Option<i32>,
    pub is_active: Option<bool>,
}

impl UpdateProduct {
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = Some(description.clone());
        }
        if let Some(sku) = &self.sku {
            product.sku = Some(sku.clone());
        }
        if let Some(product_type) = self.product_type {
            product.product_type = product_type.as_str().to_string();
        }
        if let Some(price) = self.unit_price {
            product.unit_price = price;
        }
        if let Some(unit) = &self.unit {
            product.unit = unit.clone();
        }
        if let Some(rate) = self.tax_rate {
            product.tax_rate = rate;
        }
        if let Some(active) = self.is_active {
            product.is_active = active;
        }
    }
}

/// Filter parameters for listing products.
#[derive(Debug, Clone, Default)]
pub struct ListProductsFilter {
    pub search: Option<String>,
    pub include_inactive: bool,
}

impl ListProductsFilter {
    /// Case-insensitive match on name, SKU or description.
    pub fn matches(&self, product: &Product) -> bool {
        if !self.include_inactive && !product.is_active {
            return false;
        }
        let Some(term) = self.search.as_deref().map(str::to_lowercase) else {
            return true;
        };
        [Some(&product.name), product.sku.as_ref(), product.description.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term))
    }
}
