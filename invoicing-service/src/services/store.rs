//! Persistence boundary for invoicing-service.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use service_core::error::AppError;
use uuid::Uuid;

use crate::domain::SubscriptionPlan;
use crate::models::{
    ActivityLog, Client, ClientRemoval, Company, CreateClient, CreateInvoice, CreateProduct,
    CreateUser, Invoice, LineItem, ListClientsFilter, ListInvoicesFilter, ListProductsFilter,
    NewActivity, NewLineItem, Product, StatusChange, UpdateClient, UpdateCompany, UpdateInvoice,
    UpdateLineItem, UpdateProduct, UpdateProfile, User,
};

/// Every read and write the service performs.
///
/// Lookups return `Ok(None)` when the row does not exist or belongs to
/// another company. Writes on invoices that are no longer drafts fail with
/// `AppError::BadRequest`, and status changes whose expected previous status
/// no longer holds fail with `AppError::Conflict`.
#[async_trait]
pub trait InvoicingStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // Users

    /// Create a user together with their company.
    async fn create_account(
        &self,
        user: &CreateUser,
        company_name: &str,
    ) -> Result<(User, Company), AppError>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn get_user_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError>;
    async fn get_user_by_reset_token(&self, token: &str) -> Result<Option<User>, AppError>;
    async fn mark_user_verified(&self, user_id: Uuid) -> Result<(), AppError>;
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_utc: DateTime<Utc>,
    ) -> Result<(), AppError>;
    /// Replace the password hash and clear any reset token.
    async fn set_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError>;
    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn update_profile(
        &self,
        user_id: Uuid,
        input: &UpdateProfile,
    ) -> Result<Option<User>, AppError>;

    // Companies

    async fn get_company_for_user(&self, user_id: Uuid) -> Result<Option<Company>, AppError>;
    /// Fails with `AppError::BadRequest` if the update would lower the
    /// invoice counter.
    async fn update_company(
        &self,
        company_id: Uuid,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, AppError>;
    async fn set_subscription_plan(
        &self,
        company_id: Uuid,
        plan: SubscriptionPlan,
    ) -> Result<Option<Company>, AppError>;
    /// Reserve the next invoice number and advance the counter atomically.
    async fn next_invoice_number(&self, company_id: Uuid) -> Result<String, AppError>;

    // Clients

    async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError>;
    async fn get_client(&self, company_id: Uuid, client_id: Uuid)
        -> Result<Option<Client>, AppError>;
    async fn list_clients(
        &self,
        company_id: Uuid,
        filter: &ListClientsFilter,
    ) -> Result<Vec<Client>, AppError>;
    async fn update_client(
        &self,
        company_id: Uuid,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError>;
    /// Deactivate a client with invoices, delete one without.
    async fn delete_client(
        &self,
        company_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<ClientRemoval>, AppError>;
    async fn count_active_clients(&self, company_id: Uuid) -> Result<i64, AppError>;

    // Products

    async fn create_product(&self, input: &CreateProduct) -> Result<Product, AppError>;
    async fn get_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError>;
    async fn list_products(
        &self,
        company_id: Uuid,
        filter: &ListProductsFilter,
    ) -> Result<Vec<Product>, AppError>;
    async fn update_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, AppError>;
    async fn deactivate_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError>;
    async fn count_active_products(&self, company_id: Uuid) -> Result<i64, AppError>;

    // Invoices

    /// Reserve a number and insert the invoice with its items in one unit.
    async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError>;
    async fn get_invoice(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError>;
    async fn list_invoices(
        &self,
        company_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError>;
    async fn count_invoices(
        &self,
        company_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<i64, AppError>;
    async fn count_invoices_created_since(
        &self,
        company_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError>;
    async fn update_invoice(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError>;
    async fn apply_status_change(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        change: &StatusChange,
    ) -> Result<Option<Invoice>, AppError>;
    /// Move sent invoices due before `today` to overdue. Returns how many
    /// were promoted.
    async fn promote_overdue(&self, company_id: Uuid, today: NaiveDate) -> Result<u64, AppError>;

    // Line items. Every mutation recomputes the invoice totals in the same unit.

    async fn get_line_items(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<LineItem>, AppError>;
    async fn add_line_item(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        input: &NewLineItem,
    ) -> Result<Option<LineItem>, AppError>;
    async fn update_line_item(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        line_item_id: Uuid,
        input: &UpdateLineItem,
    ) -> Result<Option<LineItem>, AppError>;
    async fn remove_line_item(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        line_item_id: Uuid,
    ) -> Result<bool, AppError>;

    // Activity

    async fn record_activity(&self, input: &NewActivity) -> Result<ActivityLog, AppError>;
    async fn list_activity(&self, user_id: Uuid, limit: i64) -> Result<Vec<ActivityLog>, AppError>;
}
