//! In-memory `InvoicingStore` for tests and local runs without PostgreSQL.
//!
//! One lock guards all tables, so every operation is atomic in the same way a
//! single database transaction would be.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::store::InvoicingStore;
use crate::domain::{
    calculate_invoice_totals, ensure_editable, format_invoice_number, InvoiceError,
    SubscriptionPlan,
};
use crate::models::{
    ActivityLog, Client, ClientRemoval, Company, CreateClient, CreateInvoice, CreateProduct,
    CreateUser, Invoice, InvoiceStatus, LineItem, ListClientsFilter, ListInvoicesFilter,
    ListProductsFilter, NewActivity, NewLineItem, Product, StatusChange, UpdateClient,
    UpdateCompany, UpdateInvoice, UpdateLineItem, UpdateProduct, UpdateProfile, User,
    DEFAULT_COUNTRY, DEFAULT_INVOICE_PREFIX, DEFAULT_PAYMENT_TERMS, DEFAULT_PRIMARY_COLOR,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    companies: HashMap<Uuid, Company>,
    clients: HashMap<Uuid, Client>,
    products: HashMap<Uuid, Product>,
    invoices: HashMap<Uuid, Invoice>,
    line_items: HashMap<Uuid, LineItem>,
    activity: Vec<ActivityLog>,
}

impl Tables {
    fn invoice_mut(&mut self, company_id: Uuid, invoice_id: Uuid) -> Option<&mut Invoice> {
        self.invoices
            .get_mut(&invoice_id)
            .filter(|inv| inv.company_id == company_id)
    }

    fn items_of(&self, invoice_id: Uuid) -> Vec<LineItem> {
        let mut items: Vec<LineItem> = self
            .line_items
            .values()
            .filter(|item| item.invoice_id == invoice_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.position);
        items
    }

    fn peek_number(&self, company_id: Uuid) -> Result<String, AppError> {
        let company = self
            .companies
            .get(&company_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;
        Ok(format_invoice_number(&company.invoice_prefix, company.next_invoice_number))
    }

    fn reserve_number(&mut self, company_id: Uuid) -> Result<String, AppError> {
        let number = self.peek_number(company_id)?;
        if let Some(company) = self.companies.get_mut(&company_id) {
            company.next_invoice_number += 1;
            company.updated_utc = Utc::now();
        }
        Ok(number)
    }

    /// Look up a draft invoice, failing if it exists in another status.
    fn draft_invoice(&self, company_id: Uuid, invoice_id: Uuid) -> Result<Option<&Invoice>, AppError> {
        match self.invoices.get(&invoice_id) {
            Some(inv) if inv.company_id == company_id => {
                ensure_editable(inv.status())?;
                Ok(Some(inv))
            }
            _ => Ok(None),
        }
    }

    fn insert_line(&mut self, invoice: &Invoice, position: i32, input: &NewLineItem) -> LineItem {
        let item = LineItem {
            line_item_id: Uuid::new_v4(),
            invoice_id: invoice.invoice_id,
            company_id: invoice.company_id,
            product_id: input.product_id,
            description: input.description.clone(),
            quantity: input.quantity,
            unit: input.unit.clone(),
            unit_price: input.unit_price,
            tax_rate: input.tax_rate,
            line_total: input.line_total,
            line_tax: input.line_tax,
            position,
            created_utc: Utc::now(),
        };
        self.line_items.insert(item.line_item_id, item.clone());
        item
    }

    fn recompute_totals(&mut self, invoice_id: Uuid) {
        let totals = calculate_invoice_totals(&self.items_of(invoice_id));
        if let Some(invoice) = self.invoices.get_mut(&invoice_id) {
            invoice.subtotal = totals.subtotal;
            invoice.tax_amount = totals.tax_amount;
            invoice.total = totals.total;
            invoice.updated_utc = Utc::now();
        }
    }
}

fn invoice_matches(invoice: &Invoice, filter: &ListInvoicesFilter) -> bool {
    filter.status.map_or(true, |s| invoice.status() == s)
        && filter.client_id.map_or(true, |c| invoice.client_id == c)
        && filter.date_from.map_or(true, |d| invoice.invoice_date >= d)
        && filter.date_to.map_or(true, |d| invoice.invoice_date <= d)
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, AppError> {
        self.tables
            .read()
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, AppError> {
        self.tables
            .write()
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("store lock poisoned")))
    }

    fn update_user<F>(&self, user_id: Uuid, apply: F) -> Result<Option<User>, AppError>
    where
        F: FnOnce(&mut User),
    {
        let mut tables = self.write()?;
        Ok(tables.users.get_mut(&user_id).map(|user| {
            apply(user);
            user.updated_utc = Utc::now();
            user.clone()
        }))
    }
}

#[async_trait]
impl InvoicingStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.read().map(|_| ())
    }

    async fn create_account(
        &self,
        input: &CreateUser,
        company_name: &str,
    ) -> Result<(User, Company), AppError> {
        let mut tables = self.write()?;
        let email = input.email.to_lowercase();
        if tables.users.values().any(|u| u.email == email) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Email '{}' is already registered",
                email
            )));
        }

        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            email: email.clone(),
            password_hash: input.password_hash.clone(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            phone: input.phone.clone(),
            is_active: true,
            is_verified: false,
            verification_token: input.verification_token.clone(),
            reset_token: None,
            reset_token_expires_utc: None,
            last_login_utc: None,
            created_utc: now,
            updated_utc: now,
        };
        let company = Company {
            company_id: Uuid::new_v4(),
            user_id: user.user_id,
            name: company_name.to_string(),
            legal_name: None,
            company_code: None,
            vat_code: None,
            registration_address: None,
            business_address: None,
            city: None,
            postal_code: None,
            country: DEFAULT_COUNTRY.to_string(),
            email: Some(email),
            phone: input.phone.clone(),
            website: None,
            bank_name: None,
            bank_account: None,
            bank_swift: None,
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            next_invoice_number: 1,
            invoice_notes: None,
            payment_terms: DEFAULT_PAYMENT_TERMS,
            subscription_plan: SubscriptionPlan::default().as_str().to_string(),
            created_utc: now,
            updated_utc: now,
        };
        tables.users.insert(user.user_id, user.clone());
        tables.companies.insert(company.company_id, company.clone());
        Ok((user, company))
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_lowercase();
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn get_user_by_reset_token(&self, token: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn mark_user_verified(&self, user_id: Uuid) -> Result<(), AppError> {
        self.update_user(user_id, |user| {
            user.is_verified = true;
            user.verification_token = None;
        })?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_utc: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.update_user(user_id, |user| {
            user.reset_token = Some(token.to_string());
            user.reset_token_expires_utc = Some(expires_utc);
        })?;
        Ok(())
    }

    async fn set_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError> {
        self.update_user(user_id, |user| {
            user.password_hash = password_hash.to_string();
            user.reset_token = None;
            user.reset_token_expires_utc = None;
        })?;
        Ok(())
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        self.update_user(user_id, |user| user.last_login_utc = Some(at))?;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        input: &UpdateProfile,
    ) -> Result<Option<User>, AppError> {
        self.update_user(user_id, |user| {
            if let Some(first_name) = &input.first_name {
                user.first_name = first_name.clone();
            }
            if let Some(last_name) = &input.last_name {
                user.last_name = last_name.clone();
            }
            if let Some(phone) = &input.phone {
                user.phone = Some(phone.clone());
            }
        })
    }

    async fn get_company_for_user(&self, user_id: Uuid) -> Result<Option<Company>, AppError> {
        Ok(self
            .read()?
            .companies
            .values()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn update_company(
        &self,
        company_id: Uuid,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, AppError> {
        let mut tables = self.write()?;
        let Some(company) = tables.companies.get_mut(&company_id) else {
            return Ok(None);
        };
        if let Some(requested) = input.next_invoice_number {
            if requested < company.next_invoice_number {
                return Err(InvoiceError::CounterDecrease {
                    current: company.next_invoice_number,
                    requested,
                }
                .into());
            }
        }
        input.apply_to(company);
        company.updated_utc = Utc::now();
        Ok(Some(company.clone()))
    }

    async fn set_subscription_plan(
        &self,
        company_id: Uuid,
        plan: SubscriptionPlan,
    ) -> Result<Option<Company>, AppError> {
        let mut tables = self.write()?;
        Ok(tables.companies.get_mut(&company_id).map(|company| {
            company.subscription_plan = plan.as_str().to_string();
            company.updated_utc = Utc::now();
            company.clone()
        }))
    }

    async fn next_invoice_number(&self, company_id: Uuid) -> Result<String, AppError> {
        self.write()?.reserve_number(company_id)
    }

    async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        let now = Utc::now();
        let client = Client {
            client_id: Uuid::new_v4(),
            company_id: input.company_id,
            name: input.name.clone(),
            legal_name: input.legal_name.clone(),
            client_type: input.client_type.as_str().to_string(),
            company_code: input.company_code.clone(),
            vat_code: input.vat_code.clone(),
            contact_person: input.contact_person.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            city: input.city.clone(),
            postal_code: input.postal_code.clone(),
            country: input
                .country
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            notes: input.notes.clone(),
            is_active: true,
            created_utc: now,
            updated_utc: now,
        };
        self.write()?.clients.insert(client.client_id, client.clone());
        Ok(client)
    }

    async fn get_client(
        &self,
        company_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, AppError> {
        Ok(self
            .read()?
            .clients
            .get(&client_id)
            .filter(|c| c.company_id == company_id)
            .cloned())
    }

    async fn list_clients(
        &self,
        company_id: Uuid,
        filter: &ListClientsFilter,
    ) -> Result<Vec<Client>, AppError> {
        let mut clients: Vec<Client> = self
            .read()?
            .clients
            .values()
            .filter(|c| c.company_id == company_id && filter.matches(c))
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn update_client(
        &self,
        company_id: Uuid,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let mut tables = self.write()?;
        Ok(tables
            .clients
            .get_mut(&client_id)
            .filter(|c| c.company_id == company_id)
            .map(|client| {
                input.apply_to(client);
                client.updated_utc = Utc::now();
                client.clone()
            }))
    }

    async fn delete_client(
        &self,
        company_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<ClientRemoval>, AppError> {
        let mut tables = self.write()?;
        let exists = tables
            .clients
            .get(&client_id)
            .is_some_and(|c| c.company_id == company_id);
        if !exists {
            return Ok(None);
        }

        let has_invoices = tables.invoices.values().any(|inv| inv.client_id == client_id);
        if has_invoices {
            if let Some(client) = tables.clients.get_mut(&client_id) {
                client.is_active = false;
                client.updated_utc = Utc::now();
            }
            Ok(Some(ClientRemoval::Deactivated))
        } else {
            tables.clients.remove(&client_id);
            Ok(Some(ClientRemoval::Deleted))
        }
    }

    async fn count_active_clients(&self, company_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .read()?
            .clients
            .values()
            .filter(|c| c.company_id == company_id && c.is_active)
            .count() as i64)
    }

    async fn create_product(&self, input: &CreateProduct) -> Result<Product, AppError> {
        let now = Utc::now();
        let product = Product {
            product_id: Uuid::new_v4(),
            company_id: input.company_id,
            name: input.name.clone(),
            description: input.description.clone(),
            sku: input.sku.clone(),
            product_type: input.product_type.as_str().to_string(),
            unit_price: input.unit_price,
            unit: input.unit.clone(),
            tax_rate: input.tax_rate,
            is_active: true,
            created_utc: now,
            updated_utc: now,
        };
        self.write()?.products.insert(product.product_id, product.clone());
        Ok(product)
    }

    async fn get_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError> {
        Ok(self
            .read()?
            .products
            .get(&product_id)
            .filter(|p| p.company_id == company_id)
            .cloned())
    }

    async fn list_products(
        &self,
        company_id: Uuid,
        filter: &ListProductsFilter,
    ) -> Result<Vec<Product>, AppError> {
        let mut products: Vec<Product> = self
            .read()?
            .products
            .values()
            .filter(|p| p.company_id == company_id && filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn update_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, AppError> {
        let mut tables = self.write()?;
        Ok(tables
            .products
            .get_mut(&product_id)
            .filter(|p| p.company_id == company_id)
            .map(|product| {
                input.apply_to(product);
                product.updated_utc = Utc::now();
                product.clone()
            }))
    }

    async fn deactivate_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError> {
        let input = UpdateProduct {
            is_active: Some(false),
            ..UpdateProduct::default()
        };
        self.update_product(company_id, product_id, &input).await
    }

    async fn count_active_products(&self, company_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .read()?
            .products
            .values()
            .filter(|p| p.company_id == company_id && p.is_active)
            .count() as i64)
    }

    async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError> {
        let mut tables = self.write()?;
        let invoice_number = tables.peek_number(input.company_id)?;
        let duplicate = tables
            .invoices
            .values()
            .any(|inv| inv.company_id == input.company_id && inv.invoice_number == invoice_number);
        if duplicate {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Invoice number '{}' already exists",
                invoice_number
            )));
        }
        tables.reserve_number(input.company_id)?;

        let now = Utc::now();
        let invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            company_id: input.company_id,
            user_id: input.user_id,
            client_id: input.client_id,
            invoice_number,
            invoice_date: input.invoice_date,
            due_date: input.due_date,
            status: InvoiceStatus::Draft.as_str().to_string(),
            subtotal: Default::default(),
            tax_amount: Default::default(),
            total: Default::default(),
            notes: input.notes.clone(),
            internal_notes: input.internal_notes.clone(),
            payment_reference: None,
            paid_date: None,
            paid_amount: None,
            sent_utc: None,
            created_utc: now,
            updated_utc: now,
        };
        tables.invoices.insert(invoice.invoice_id, invoice.clone());
        for (position, item) in input.items.iter().enumerate() {
            tables.insert_line(&invoice, position as i32, item);
        }
        tables.recompute_totals(invoice.invoice_id);

        tables
            .invoices
            .get(&invoice.invoice_id)
            .cloned()
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Invoice vanished on insert")))
    }

    async fn get_invoice(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        Ok(self
            .read()?
            .invoices
            .get(&invoice_id)
            .filter(|inv| inv.company_id == company_id)
            .cloned())
    }

    async fn list_invoices(
        &self,
        company_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let mut invoices: Vec<Invoice> = self
            .read()?
            .invoices
            .values()
            .filter(|inv| inv.company_id == company_id && invoice_matches(inv, filter))
            .cloned()
            .collect();
        invoices.sort_by(|a, b| {
            b.invoice_date
                .cmp(&a.invoice_date)
                .then_with(|| b.invoice_number.cmp(&a.invoice_number))
        });
        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.per_page).unwrap_or(usize::MAX);
        Ok(invoices.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_invoices(
        &self,
        company_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<i64, AppError> {
        Ok(self
            .read()?
            .invoices
            .values()
            .filter(|inv| inv.company_id == company_id && invoice_matches(inv, filter))
            .count() as i64)
    }

    async fn count_invoices_created_since(
        &self,
        company_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        Ok(self
            .read()?
            .invoices
            .values()
            .filter(|inv| inv.company_id == company_id && inv.created_utc >= since)
            .count() as i64)
    }

    async fn update_invoice(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError> {
        let mut tables = self.write()?;
        if tables.draft_invoice(company_id, invoice_id)?.is_none() {
            return Ok(None);
        }
        Ok(tables.invoice_mut(company_id, invoice_id).map(|invoice| {
            if let Some(client_id) = input.client_id {
                invoice.client_id = client_id;
            }
            if let Some(date) = input.invoice_date {
                invoice.invoice_date = date;
            }
            if let Some(due) = input.due_date {
                invoice.due_date = due;
            }
            if let Some(notes) = &input.notes {
                invoice.notes = Some(notes.clone());
            }
            if let Some(internal) = &input.internal_notes {
                invoice.internal_notes = Some(internal.clone());
            }
            invoice.updated_utc = Utc::now();
            invoice.clone()
        }))
    }

    async fn apply_status_change(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        change: &StatusChange,
    ) -> Result<Option<Invoice>, AppError> {
        let mut tables = self.write()?;
        let Some(invoice) = tables.invoice_mut(company_id, invoice_id) else {
            return Ok(None);
        };
        if invoice.status() != change.from {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Invoice {} changed from {} to {} concurrently",
                invoice.invoice_number,
                change.from,
                invoice.status
            )));
        }

        invoice.status = change.to.as_str().to_string();
        if change.sent_utc.is_some() {
            invoice.sent_utc = change.sent_utc;
        }
        if invoice.payment_reference.is_none() {
            invoice.payment_reference = change.payment_reference.clone();
        }
        if change.paid_date.is_some() {
            invoice.paid_date = change.paid_date;
        }
        if change.paid_amount.is_some() {
            invoice.paid_amount = change.paid_amount;
        }
        invoice.updated_utc = Utc::now();
        Ok(Some(invoice.clone()))
    }

    async fn promote_overdue(&self, company_id: Uuid, today: NaiveDate) -> Result<u64, AppError> {
        let mut tables = self.write()?;
        let mut promoted = 0;
        for invoice in tables.invoices.values_mut() {
            if invoice.company_id == company_id
                && invoice.status() == InvoiceStatus::Sent
                && invoice.due_date < today
            {
                invoice.status = InvoiceStatus::Overdue.as_str().to_string();
                invoice.updated_utc = Utc::now();
                promoted += 1;
            }
        }
        Ok(promoted)
    }

    async fn get_line_items(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<LineItem>, AppError> {
        let tables = self.read()?;
        let owned = tables
            .invoices
            .get(&invoice_id)
            .is_some_and(|inv| inv.company_id == company_id);
        if !owned {
            return Ok(Vec::new());
        }
        Ok(tables.items_of(invoice_id))
    }

    async fn add_line_item(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        input: &NewLineItem,
    ) -> Result<Option<LineItem>, AppError> {
        let mut tables = self.write()?;
        let Some(invoice) = tables.draft_invoice(company_id, invoice_id)?.cloned() else {
            return Ok(None);
        };
        let position = tables
            .items_of(invoice_id)
            .last()
            .map_or(0, |item| item.position + 1);
        let item = tables.insert_line(&invoice, position, input);
        tables.recompute_totals(invoice_id);
        Ok(Some(item))
    }

    async fn update_line_item(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        line_item_id: Uuid,
        input: &UpdateLineItem,
    ) -> Result<Option<LineItem>, AppError> {
        let mut tables = self.write()?;
        if tables.draft_invoice(company_id, invoice_id)?.is_none() {
            return Ok(None);
        }
        let Some(item) = tables
            .line_items
            .get_mut(&line_item_id)
            .filter(|item| item.invoice_id == invoice_id)
        else {
            return Ok(None);
        };
        input.apply_to(item)?;
        let updated = item.clone();
        tables.recompute_totals(invoice_id);
        Ok(Some(updated))
    }

    async fn remove_line_item(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        line_item_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut tables = self.write()?;
        if tables.draft_invoice(company_id, invoice_id)?.is_none() {
            return Ok(false);
        }
        let belongs = tables
            .line_items
            .get(&line_item_id)
            .is_some_and(|item| item.invoice_id == invoice_id);
        if !belongs {
            return Ok(false);
        }
        tables.line_items.remove(&line_item_id);
        tables.recompute_totals(invoice_id);
        Ok(true)
    }

    async fn record_activity(&self, input: &NewActivity) -> Result<ActivityLog, AppError> {
        let entry = ActivityLog {
            activity_id: Uuid::new_v4(),
            user_id: input.user_id,
            action: input.action.clone(),
            entity_type: input.entity_type.clone(),
            entity_id: input.entity_id,
            details: input.details.clone(),
            ip_address: input.ip_address.clone(),
            created_utc: Utc::now(),
        };
        self.write()?.activity.push(entry.clone());
        Ok(entry)
    }

    async fn list_activity(&self, user_id: Uuid, limit: i64) -> Result<Vec<ActivityLog>, AppError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .read()?
            .activity
            .iter()
            .rev()
            .filter(|entry| entry.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
