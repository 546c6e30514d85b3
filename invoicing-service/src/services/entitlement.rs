//! Plan limit checks against live usage.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::domain::{is_within_limit, InvoiceError, ResourceKind, SubscriptionPlan};
use crate::models::Company;
use crate::services::metrics::ENTITLEMENT_DENIALS_TOTAL;
use crate::services::store::InvoicingStore;

/// Usage of one limited resource.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct ResourceUsage {
    pub used: i64,
    /// `-1` when unlimited.
    pub limit: i64,
}

/// Usage of every limited resource for a company.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlanUsage {
    pub plan: SubscriptionPlan,
    pub invoices_this_month: ResourceUsage,
    pub clients: ResourceUsage,
    pub products: ResourceUsage,
    pub reports: bool,
}

/// Start of the calendar month containing `now`, in UTC.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

#[derive(Clone)]
pub struct EntitlementChecker {
    store: Arc<dyn InvoicingStore>,
}

impl EntitlementChecker {
    pub fn new(store: Arc<dyn InvoicingStore>) -> Self {
        Self { store }
    }

    async fn usage_of(&self, company: &Company, kind: ResourceKind) -> Result<i64, AppError> {
        match kind {
            ResourceKind::Invoice => {
                self.store
                    .count_invoices_created_since(company.company_id, month_start(Utc::now()))
                    .await
            }
            ResourceKind::Client => self.store.count_active_clients(company.company_id).await,
            ResourceKind::Product => self.store.count_active_products(company.company_id).await,
        }
    }

    /// Whether the company may create one more `kind`.
    pub async fn can_create(&self, company: &Company, kind: ResourceKind) -> Result<bool, AppError> {
        let limit = company.plan().limit_for(kind);
        if limit == crate::domain::UNLIMITED {
            return Ok(true);
        }
        let usage = self.usage_of(company, kind).await?;
        Ok(is_within_limit(limit, usage))
    }

    #[instrument(skip(self, company), fields(company_id = %company.company_id, resource = kind.as_str()))]
    pub async fn ensure_can_create(&self, company: &Company, kind: ResourceKind) -> Result<(), AppError> {
        if self.can_create(company, kind).await? {
            return Ok(());
        }
        let plan = company.plan();
        ENTITLEMENT_DENIALS_TOTAL
            .with_label_values(&[kind.as_str(), plan.as_str()])
            .inc();
        info!(plan = plan.as_str(), "Plan limit reached");
        Err(InvoiceError::LimitReached(kind).into())
    }

    /// Fails unless the company's plan includes reports.
    pub fn ensure_reports(&self, company: &Company) -> Result<(), AppError> {
        let plan = company.plan();
        if plan.limits().reports {
            Ok(())
        } else {
            Err(InvoiceError::ReportsNotIncluded(plan).into())
        }
    }

    pub async fn usage(&self, company: &Company) -> Result<PlanUsage, AppError> {
        let plan = company.plan();
        let limits = plan.limits();
        Ok(PlanUsage {
            plan,
            invoices_this_month: ResourceUsage {
                used: self.usage_of(company, ResourceKind::Invoice).await?,
                limit: limits.invoices_per_month,
            },
            clients: ResourceUsage {
                used: self.usage_of(company, ResourceKind::Client).await?,
                limit: limits.clients,
            },
            products: ResourceUsage {
                used: self.usage_of(company, ResourceKind::Product).await?,
                limit: limits.products,
            },
            reports: limits.reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateClient, CreateUser, ClientType};
    use crate::services::in_memory::InMemoryStore;

    async fn setup() -> (Arc<InMemoryStore>, Company) {
        let store = Arc::new(InMemoryStore::new());
        let (_, company) = store
            .create_account(
                &CreateUser {
                    email: "jonas@example.lt".to_string(),
                    password_hash: "hash".to_string(),
                    first_name: "Jonas".to_string(),
                    last_name: "Jonaitis".to_string(),
                    phone: None,
                    verification_token: None,
                },
                "Jonas Jonaitis",
            )
            .await
            .unwrap();
        (store, company)
    }

    fn client(company: &Company, name: &str) -> CreateClient {
        CreateClient {
            company_id: company.company_id,
            name: name.to_string(),
            legal_name: None,
            client_type: ClientType::Company,
            company_code: None,
            vat_code: None,
            contact_person: None,
            email: None,
            phone: None,
            address: None,
            city: None,
            postal_code: None,
            country: None,
            notes: None,
        }
    }

    #[test]
    fn month_start_is_first_day_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 7, 19, 15, 30, 0).unwrap();
        assert_eq!(month_start(now), Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn free_plan_stops_at_ten_clients() {
        let (store, company) = setup().await;
        let checker = EntitlementChecker::new(store.clone());

        for i in 0..10 {
            checker.ensure_can_create(&company, ResourceKind::Client).await.unwrap();
            store.create_client(&client(&company, &format!("Client {i}"))).await.unwrap();
        }

        let err = checker
            .ensure_can_create(&company, ResourceKind::Client)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PaymentRequired(_)));
    }

    #[tokio::test]
    async fn pro_plan_is_unlimited() {
        let (store, company) = setup().await;
        let company = store
            .set_subscription_plan(company.company_id, SubscriptionPlan::Pro)
            .await
            .unwrap()
            .unwrap();
        let checker = EntitlementChecker::new(store.clone());

        for i in 0..25 {
            store.create_client(&client(&company, &format!("Client {i}"))).await.unwrap();
        }
        assert!(checker.can_create(&company, ResourceKind::Client).await.unwrap());
        assert!(checker.ensure_reports(&company).is_ok());
    }

    #[tokio::test]
    async fn reports_are_forbidden_on_free_plan() {
        let (store, company) = setup().await;
        let checker = EntitlementChecker::new(store);
        assert!(matches!(checker.ensure_reports(&company), Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn usage_reports_counts_and_limits() {
        let (store, company) = setup().await;
        store.create_client(&client(&company, "Only")).await.unwrap();
        let usage = EntitlementChecker::new(store).usage(&company).await.unwrap();

        assert_eq!(usage.plan, SubscriptionPlan::Free);
        assert_eq!(usage.clients.used, 1);
        assert_eq!(usage.clients.limit, 10);
        assert_eq!(usage.invoices_this_month.limit, 5);
        assert!(!usage.reports);
    }
}
