use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::non_blank;
use crate::domain::{PlanLimits, SubscriptionPlan};
use crate::models::UpdateCompany;
use crate::services::PlanUsage;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "UAB Pavyzdys")]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub legal_name: Option<String>,
    #[validate(length(max = 20))]
    pub company_code: Option<String>,
    #[validate(length(max = 20))]
    #[schema(example = "LT123456789")]
    pub vat_code: Option<String>,
    #[validate(length(max = 300))]
    pub registration_address: Option<String>,
    #[validate(length(max = 300))]
    pub business_address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub website: Option<String>,
    #[validate(length(max = 100))]
    pub bank_name: Option<String>,
    #[validate(length(max = 34))]
    pub bank_account: Option<String>,
    #[validate(length(max = 11))]
    pub bank_swift: Option<String>,
}

impl From<UpdateCompanyRequest> for UpdateCompany {
    fn from(req: UpdateCompanyRequest) -> Self {
        UpdateCompany {
            name: non_blank(req.name),
            legal_name: req.legal_name,
            company_code: req.company_code,
            vat_code: req.vat_code,
            registration_address: req.registration_address,
            business_address: req.business_address,
            city: req.city,
            postal_code: req.postal_code,
            country: non_blank(req.country),
            email: req.email,
            phone: req.phone,
            website: req.website,
            bank_name: req.bank_name,
            bank_account: req.bank_account,
            bank_swift: req.bank_swift,
            ..UpdateCompany::default()
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InvoiceSettingsRequest {
    #[validate(length(min = 1, max = 10, message = "Prefix must be 1-10 characters"))]
    #[schema(example = "SF")]
    pub invoice_prefix: Option<String>,
    #[validate(range(min = 0, max = 365, message = "Payment terms must be 0-365 days"))]
    #[schema(example = 14)]
    pub payment_terms: Option<i32>,
    #[validate(length(max = 2000))]
    pub invoice_notes: Option<String>,
    #[validate(length(equal = 7, message = "Colour must look like #2563eb"))]
    #[schema(example = "#2563eb")]
    pub primary_color: Option<String>,
    /// Raise the next invoice number. Lower values are rejected.
    #[validate(range(min = 1))]
    pub next_invoice_number: Option<i64>,
}

impl From<InvoiceSettingsRequest> for UpdateCompany {
    fn from(req: InvoiceSettingsRequest) -> Self {
        UpdateCompany {
            invoice_prefix: non_blank(req.invoice_prefix),
            payment_terms: req.payment_terms,
            invoice_notes: req.invoice_notes,
            primary_color: non_blank(req.primary_color),
            next_invoice_number: req.next_invoice_number,
            ..UpdateCompany::default()
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlanResponse {
    pub plan: SubscriptionPlan,
    #[schema(example = "Profesionalus")]
    pub name: String,
    pub limits: PlanLimits,
}

impl From<SubscriptionPlan> for PlanResponse {
    fn from(plan: SubscriptionPlan) -> Self {
        Self {
            plan,
            name: plan.display_name().to_string(),
            limits: plan.limits(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSubscriptionRequest {
    pub plan: SubscriptionPlan,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    pub plan: PlanResponse,
    pub usage: PlanUsage,
}
