//! Company (tenant) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::SubscriptionPlan;

pub const DEFAULT_INVOICE_PREFIX: &str = "SF";
pub const DEFAULT_PAYMENT_TERMS: i32 = 14;
pub const DEFAULT_COUNTRY: &str = "Lietuva";
pub const DEFAULT_PRIMARY_COLOR: &str = "#2563eb";

/// Business profile owning clients, products and invoices.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Company {
    pub company_id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "UAB Pavyzdys")]
    pub name: String,
    pub legal_name: Option<String>,
    pub company_code: Option<String>,
    #[schema(example = "LT123456789")]
    pub vat_code: Option<String>,
    pub registration_address: Option<String>,
    pub business_address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub bank_swift: Option<String>,
    pub primary_color: String,
    #[schema(example = "SF")]
    pub invoice_prefix: String,
    /// Counter for the next invoice number. Only ever increases.
    pub next_invoice_number: i64,
    pub invoice_notes: Option<String>,
    pub payment_terms: i32,
    #[schema(example = "free")]
    pub subscription_plan: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Company {
    /// Subscription plan, falling back to free for unknown values.
    pub fn plan(&self) -> SubscriptionPlan {
        SubscriptionPlan::parse(&self.subscription_plan).unwrap_or_default()
    }
}

/// Input for creating a company.
#[derive(Debug, Clone)]
pub struct CreateCompany {
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

/// Partial update of the company profile.
#[derive(Debug, Clone, Default)]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub legal_name: Option<String>,
    pub company_code: Option<String>,
    pub vat_code: Option<String>,
    pub registration_address: Option<String>,
    pub business_address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account: Option<String>,
    pub bank_swift: Option<String>,
    pub primary_color: Option<String>,
    pub invoice_prefix: Option<String>,
    pub invoice_notes: Option<String>,
    pub payment_terms: Option<i32>,
    /// New counter value; the store rejects values below the current one.
    pub next_invoice_number: Option<i64>,
}

impl UpdateCompany {
    /// Merge onto `company`. The counter is left to the caller's guard.
    pub fn apply_to(&self, company: &mut Company) {
        fn set(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                *target = Some(v.clone());
            }
        }

        if let Some(name) = &self.name {
            company.name = name.clone();
        }
        set(&mut company.legal_name, &self.legal_name);
        set(&mut company.company_code, &self.company_code);
        set(&mut company.vat_code, &self.vat_code);
        set(&mut company.registration_address, &self.registration_address);
        set(&mut company.business_address, &self.business_address);
        set(&mut company.city, &self.city);
        set(&mut company.postal_code, &self.postal_code);
        if let Some(country) = &self.country {
            company.country = country.clone();
        }
        set(&mut company.email, &self.email);
        set(&mut company.phone, &self.phone);
        set(&mut company.website, &self.website);
        set(&mut company.bank_name, &self.bank_name);
        set(&mut company.bank_account, &self.bank_account);
        set(&mut company.bank_swift, &self.bank_swift);
        if let Some(color) = &self.primary_color {
            company.primary_color = color.clone();
        }
        if let Some(prefix) = &self.invoice_prefix {
            company.invoice_prefix = prefix.clone();
        }
        set(&mut company.invoice_notes, &self.invoice_notes);
        if let Some(terms) = self.payment_terms {
            company.payment_terms = terms;
        }
        if let Some(counter) = self.next_invoice_number {
            company.next_invoice_number = counter;
        }
    }
}
