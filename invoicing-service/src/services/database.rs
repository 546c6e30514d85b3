//! PostgreSQL store for invoicing-service.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument, warn};
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
};
use crate::services::metrics::DB_QUERY_DURATION;

const USER_COLUMNS: &str = "user_id, email, password_hash, first_name, last_name, phone, \
    is_active, is_verified, verification_token, reset_token, reset_token_expires_utc, \
    last_login_utc, created_utc, updated_utc";

const COMPANY_COLUMNS: &str = "company_id, user_id, name, legal_name, company_code, vat_code, \
    registration_address, business_address, city, postal_code, country, email, phone, website, \
    bank_name, bank_account, bank_swift, primary_color, invoice_prefix, next_invoice_number, \
    invoice_notes, payment_terms, subscription_plan, created_utc, updated_utc";

const CLIENT_COLUMNS: &str = "client_id, company_id, name, legal_name, client_type, company_code, \
    vat_code, contact_person, email, phone, address, city, postal_code, country, notes, \
    is_active, created_utc, updated_utc";

const PRODUCT_COLUMNS: &str = "product_id, company_id, name, description, sku, product_type, \
    unit_price, unit, tax_rate, is_active, created_utc, updated_utc";

const INVOICE_COLUMNS: &str = "invoice_id, company_id, user_id, client_id, invoice_number, \
    invoice_date, due_date, status, subtotal, tax_amount, total, notes, internal_notes, \
    payment_reference, paid_date, paid_amount, sent_utc, created_utc, updated_utc";

const LINE_ITEM_COLUMNS: &str = "line_item_id, invoice_id, company_id, product_id, description, \
    quantity, unit, unit_price, tax_rate, line_total, line_tax, position, created_utc";

const ACTIVITY_COLUMNS: &str =
    "activity_id, user_id, action, entity_type, entity_id, details, ip_address, created_utc";

/// Map a sqlx failure to `AppError::DatabaseError` with context.
fn failed(action: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", action, e))
}

fn like_pattern(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoicing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, AppError> {
        self.pool.begin().await.map_err(failed("begin transaction"))
    }

    async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), AppError> {
        tx.commit().await.map_err(failed("commit transaction"))
    }

    /// Advance the counter under the company row lock and render the
    /// reserved number.
    async fn reserve_number(
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
    ) -> Result<String, AppError> {
        let reserved = sqlx::query_as::<_, (String, i64)>(
            r#"
            UPDATE companies
            SET next_invoice_number = next_invoice_number + 1,
                updated_utc = NOW()
            WHERE company_id = $1
            RETURNING invoice_prefix, next_invoice_number - 1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(failed("reserve invoice number"))?;

        match reserved {
            Some((prefix, counter)) => Ok(format_invoice_number(&prefix, counter)),
            None => Err(AppError::NotFound(anyhow::anyhow!("Company not found"))),
        }
    }

    /// Lock the invoice row. Returns `false` when missing and fails when the
    /// invoice is no longer a draft.
    async fn lock_draft(
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<bool, AppError> {
        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM invoices WHERE company_id = $1 AND invoice_id = $2 FOR UPDATE",
        )
        .bind(company_id)
        .bind(invoice_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(failed("lock invoice"))?;

        match status.as_deref().map(InvoiceStatus::parse) {
            None => Ok(false),
            Some(Some(status)) => {
                ensure_editable(status)?;
                Ok(true)
            }
            Some(None) => Err(AppError::InternalError(anyhow::anyhow!(
                "Invoice {} has an unknown status",
                invoice_id
            ))),
        }
    }

    async fn insert_line(
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
        invoice_id: Uuid,
        position: i32,
        input: &NewLineItem,
    ) -> Result<LineItem, AppError> {
        sqlx::query_as::<_, LineItem>(&format!(
            r#"
            INSERT INTO line_items (
                line_item_id, invoice_id, company_id, product_id, description, quantity,
                unit, unit_price, tax_rate, line_total, line_tax, position
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {LINE_ITEM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(company_id)
        .bind(input.product_id)
        .bind(&input.description)
        .bind(input.quantity)
        .bind(&input.unit)
        .bind(input.unit_price)
        .bind(input.tax_rate)
        .bind(input.line_total)
        .bind(input.line_tax)
        .bind(position)
        .fetch_one(&mut **tx)
        .await
        .map_err(failed("insert line item"))
    }

    /// Persist totals derived from the invoice's stored lines.
    async fn recompute_totals(
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: Uuid,
    ) -> Result<(), AppError> {
        let items = sqlx::query_as::<_, LineItem>(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items WHERE invoice_id = $1 ORDER BY position"
        ))
        .bind(invoice_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(failed("load line items"))?;

        let totals = calculate_invoice_totals(&items);

        sqlx::query(
            r#"
            UPDATE invoices
            SET subtotal = $2, tax_amount = $3, total = $4, updated_utc = NOW()
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .bind(totals.subtotal)
        .bind(totals.tax_amount)
        .bind(totals.total)
        .execute(&mut **tx)
        .await
        .map_err(failed("update invoice totals"))?;

        Ok(())
    }

    async fn fetch_user(&self, column: &str, value: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("get user"))
    }
}

#[async_trait]
impl InvoicingStore for Database {
    /// Check database health.
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // User Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input, company_name))]
    async fn create_account(
        &self,
        input: &CreateUser,
        company_name: &str,
    ) -> Result<(User, Company), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_account"])
            .start_timer();

        let email = input.email.to_lowercase();
        let mut tx = self.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (user_id, email, password_hash, first_name, last_name, phone, verification_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&input.password_hash)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone)
        .bind(&input.verification_token)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Email '{}' is already registered", email))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e)),
        })?;

        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            INSERT INTO companies (company_id, user_id, name, email, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user.user_id)
        .bind(company_name)
        .bind(&email)
        .bind(&input.phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(failed("create company"))?;

        Self::commit(tx).await?;
        timer.observe_duration();

        info!(user_id = %user.user_id, company_id = %company.company_id, "Account created");

        Ok((user, company))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("get user"))
    }

    #[instrument(skip(self, email))]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.fetch_user("email", &email.to_lowercase()).await
    }

    #[instrument(skip(self, token))]
    async fn get_user_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError> {
        self.fetch_user("verification_token", token).await
    }

    #[instrument(skip(self, token))]
    async fn get_user_by_reset_token(&self, token: &str) -> Result<Option<User>, AppError> {
        self.fetch_user("reset_token", token).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn mark_user_verified(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_verified = TRUE, verification_token = NULL, updated_utc = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(failed("verify user"))?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(user_id = %user_id))]
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_utc: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_token = $2, reset_token_expires_utc = $3, updated_utc = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_utc)
        .execute(&self.pool)
        .await
        .map_err(failed("set reset token"))?;
        Ok(())
    }

    #[instrument(skip(self, password_hash), fields(user_id = %user_id))]
    async fn set_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, reset_token = NULL, reset_token_expires_utc = NULL, updated_utc = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(failed("set password"))?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_utc = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(failed("record login"))?;
        Ok(())
    }

    #[instrument(skip(self, input), fields(user_id = %user_id))]
    async fn update_profile(
        &self,
        user_id: Uuid,
        input: &UpdateProfile,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                updated_utc = NOW()
            WHERE user_id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("update profile"))
    }

    // -------------------------------------------------------------------------
    // Company Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_company_for_user(&self, user_id: Uuid) -> Result<Option<Company>, AppError> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("get company"))
    }

    #[instrument(skip(self, input), fields(company_id = %company_id))]
    async fn update_company(
        &self,
        company_id: Uuid,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_company"])
            .start_timer();

        let mut tx = self.begin().await?;

        let current = sqlx::query_scalar::<_, i64>(
            "SELECT next_invoice_number FROM companies WHERE company_id = $1 FOR UPDATE",
        )
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(failed("lock company"))?;

        let Some(current) = current else {
            return Ok(None);
        };
        if let Some(requested) = input.next_invoice_number {
            if requested < current {
                return Err(InvoiceError::CounterDecrease { current, requested }.into());
            }
        }

        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            UPDATE companies
            SET name = COALESCE($2, name),
                legal_name = COALESCE($3, legal_name),
                company_code = COALESCE($4, company_code),
                vat_code = COALESCE($5, vat_code),
                registration_address = COALESCE($6, registration_address),
                business_address = COALESCE($7, business_address),
                city = COALESCE($8, city),
                postal_code = COALESCE($9, postal_code),
                country = COALESCE($10, country),
                email = COALESCE($11, email),
                phone = COALESCE($12, phone),
                website = COALESCE($13, website),
                bank_name = COALESCE($14, bank_name),
                bank_account = COALESCE($15, bank_account),
                bank_swift = COALESCE($16, bank_swift),
                primary_color = COALESCE($17, primary_color),
                invoice_prefix = COALESCE($18, invoice_prefix),
                invoice_notes = COALESCE($19, invoice_notes),
                payment_terms = COALESCE($20, payment_terms),
                next_invoice_number = GREATEST(next_invoice_number, COALESCE($21, next_invoice_number)),
                updated_utc = NOW()
            WHERE company_id = $1
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(&input.name)
        .bind(&input.legal_name)
        .bind(&input.company_code)
        .bind(&input.vat_code)
        .bind(&input.registration_address)
        .bind(&input.business_address)
        .bind(&input.city)
        .bind(&input.postal_code)
        .bind(&input.country)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.website)
        .bind(&input.bank_name)
        .bind(&input.bank_account)
        .bind(&input.bank_swift)
        .bind(&input.primary_color)
        .bind(&input.invoice_prefix)
        .bind(&input.invoice_notes)
        .bind(input.payment_terms)
        .bind(input.next_invoice_number)
        .fetch_optional(&mut *tx)
        .await
        .map_err(failed("update company"))?;

        Self::commit(tx).await?;
        timer.observe_duration();

        if let Some(ref c) = company {
            info!(company_id = %c.company_id, "Company updated");
        }

        Ok(company)
    }

    #[instrument(skip(self), fields(company_id = %company_id, plan = %plan))]
    async fn set_subscription_plan(
        &self,
        company_id: Uuid,
        plan: SubscriptionPlan,
    ) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            UPDATE companies
            SET subscription_plan = $2, updated_utc = NOW()
            WHERE company_id = $1
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(plan.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("set subscription plan"))?;

        if company.is_some() {
            info!("Subscription plan changed");
        }

        Ok(company)
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn next_invoice_number(&self, company_id: Uuid) -> Result<String, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["next_invoice_number"])
            .start_timer();

        let mut tx = self.begin().await?;
        let number = Self::reserve_number(&mut tx, company_id).await?;
        Self::commit(tx).await?;

        timer.observe_duration();

        Ok(number)
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(company_id = %input.company_id))]
    async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (
                client_id, company_id, name, legal_name, client_type, company_code, vat_code,
                contact_person, email, phone, address, city, postal_code, country, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, COALESCE($14, 'Lietuva'), $15)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(&input.name)
        .bind(&input.legal_name)
        .bind(input.client_type.as_str())
        .bind(&input.company_code)
        .bind(&input.vat_code)
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.postal_code)
        .bind(&input.country)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("create client"))?;

        timer.observe_duration();

        info!(client_id = %client.client_id, "Client created");

        Ok(client)
    }

    #[instrument(skip(self), fields(company_id = %company_id, client_id = %client_id))]
    async fn get_client(
        &self,
        company_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, AppError> {
        sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE company_id = $1 AND client_id = $2"
        ))
        .bind(company_id)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("get client"))
    }

    #[instrument(skip(self, filter), fields(company_id = %company_id))]
    async fn list_clients(
        &self,
        company_id: Uuid,
        filter: &ListClientsFilter,
    ) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(&format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients
            WHERE company_id = $1
              AND ($2::bool = TRUE OR is_active = TRUE)
              AND ($3::text IS NULL OR name ILIKE $3 OR company_code ILIKE $3 OR email ILIKE $3)
            ORDER BY name
            "#
        ))
        .bind(company_id)
        .bind(filter.include_inactive)
        .bind(like_pattern(&filter.search))
        .fetch_all(&self.pool)
        .await
        .map_err(failed("list clients"))?;

        timer.observe_duration();

        Ok(clients)
    }

    #[instrument(skip(self, input), fields(company_id = %company_id, client_id = %client_id))]
    async fn update_client(
        &self,
        company_id: Uuid,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = COALESCE($3, name),
                legal_name = COALESCE($4, legal_name),
                client_type = COALESCE($5, client_type),
                company_code = COALESCE($6, company_code),
                vat_code = COALESCE($7, vat_code),
                contact_person = COALESCE($8, contact_person),
                email = COALESCE($9, email),
                phone = COALESCE($10, phone),
                address = COALESCE($11, address),
                city = COALESCE($12, city),
                postal_code = COALESCE($13, postal_code),
                country = COALESCE($14, country),
                notes = COALESCE($15, notes),
                is_active = COALESCE($16, is_active),
                updated_utc = NOW()
            WHERE company_id = $1 AND client_id = $2
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.legal_name)
        .bind(input.client_type.map(|t| t.as_str()))
        .bind(&input.company_code)
        .bind(&input.vat_code)
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.postal_code)
        .bind(&input.country)
        .bind(&input.notes)
        .bind(input.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("update client"))?;

        if client.is_some() {
            info!("Client updated");
        }

        Ok(client)
    }

    #[instrument(skip(self), fields(company_id = %company_id, client_id = %client_id))]
    async fn delete_client(
        &self,
        company_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<ClientRemoval>, AppError> {
        let mut tx = self.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>(
            "SELECT client_id FROM clients WHERE company_id = $1 AND client_id = $2 FOR UPDATE",
        )
        .bind(company_id)
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(failed("lock client"))?;
        if locked.is_none() {
            return Ok(None);
        }

        let has_invoices = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM invoices WHERE client_id = $1)",
        )
        .bind(client_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(failed("check client invoices"))?;

        let removal = if has_invoices {
            sqlx::query("UPDATE clients SET is_active = FALSE, updated_utc = NOW() WHERE client_id = $1")
                .bind(client_id)
                .execute(&mut *tx)
                .await
                .map_err(failed("deactivate client"))?;
            ClientRemoval::Deactivated
        } else {
            sqlx::query("DELETE FROM clients WHERE client_id = $1")
                .bind(client_id)
                .execute(&mut *tx)
                .await
                .map_err(failed("delete client"))?;
            ClientRemoval::Deleted
        };

        Self::commit(tx).await?;

        info!(removal = ?removal, "Client removed");

        Ok(Some(removal))
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn count_active_clients(&self, company_id: Uuid) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM clients WHERE company_id = $1 AND is_active = TRUE",
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("count clients"))
    }

    // -------------------------------------------------------------------------
    // Product Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(company_id = %input.company_id))]
    async fn create_product(&self, input: &CreateProduct) -> Result<Product, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (
                product_id, company_id, name, description, sku, product_type, unit_price, unit, tax_rate
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.sku)
        .bind(input.product_type.as_str())
        .bind(input.unit_price)
        .bind(&input.unit)
        .bind(input.tax_rate)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("create product"))?;

        timer.observe_duration();

        info!(product_id = %product.product_id, "Product created");

        Ok(product)
    }

    #[instrument(skip(self), fields(company_id = %company_id, product_id = %product_id))]
    async fn get_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE company_id = $1 AND product_id = $2"
        ))
        .bind(company_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("get product"))
    }

    #[instrument(skip(self, filter), fields(company_id = %company_id))]
    async fn list_products(
        &self,
        company_id: Uuid,
        filter: &ListProductsFilter,
    ) -> Result<Vec<Product>, AppError> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE company_id = $1
              AND ($2::bool = TRUE OR is_active = TRUE)
              AND ($3::text IS NULL OR name ILIKE $3 OR sku ILIKE $3 OR description ILIKE $3)
            ORDER BY name
            "#
        ))
        .bind(company_id)
        .bind(filter.include_inactive)
        .bind(like_pattern(&filter.search))
        .fetch_all(&self.pool)
        .await
        .map_err(failed("list products"))
    }

    #[instrument(skip(self, input), fields(company_id = %company_id, product_id = %product_id))]
    async fn update_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = COALESCE($3, name),
                description = COALESCE($4, description),
                sku = COALESCE($5, sku),
                product_type = COALESCE($6, product_type),
                unit_price = COALESCE($7, unit_price),
                unit = COALESCE($8, unit),
                tax_rate = COALESCE($9, tax_rate),
                is_active = COALESCE($10, is_active),
                updated_utc = NOW()
            WHERE company_id = $1 AND product_id = $2
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(product_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.sku)
        .bind(input.product_type.map(|t| t.as_str()))
        .bind(input.unit_price)
        .bind(&input.unit)
        .bind(input.tax_rate)
        .bind(input.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("update product"))?;

        if product.is_some() {
            info!("Product updated");
        }

        Ok(product)
    }

    #[instrument(skip(self), fields(company_id = %company_id, product_id = %product_id))]
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

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn count_active_products(&self, company_id: Uuid) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE company_id = $1 AND is_active = TRUE",
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("count products"))
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(company_id = %input.company_id, client_id = %input.client_id))]
    async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let mut tx = self.begin().await?;
        let invoice_number = Self::reserve_number(&mut tx, input.company_id).await?;

        let invoice_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO invoices (
                invoice_id, company_id, user_id, client_id, invoice_number, invoice_date,
                due_date, status, notes, internal_notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft', $8, $9)
            "#,
        )
        .bind(invoice_id)
        .bind(input.company_id)
        .bind(input.user_id)
        .bind(input.client_id)
        .bind(&invoice_number)
        .bind(input.invoice_date)
        .bind(input.due_date)
        .bind(&input.notes)
        .bind(&input.internal_notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Invoice number '{}' already exists",
                    invoice_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)),
        })?;

        for (position, item) in input.items.iter().enumerate() {
            Self::insert_line(&mut tx, input.company_id, invoice_id, position as i32, item).await?;
        }
        Self::recompute_totals(&mut tx, invoice_id).await?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1"
        ))
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(failed("load created invoice"))?;

        Self::commit(tx).await?;
        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            "Invoice created"
        );

        Ok(invoice)
    }

    #[instrument(skip(self), fields(company_id = %company_id, invoice_id = %invoice_id))]
    async fn get_invoice(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE company_id = $1 AND invoice_id = $2"
        ))
        .bind(company_id)
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("get invoice"))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self, filter), fields(company_id = %company_id))]
    async fn list_invoices(
        &self,
        company_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE company_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR client_id = $3)
              AND ($4::date IS NULL OR invoice_date >= $4)
              AND ($5::date IS NULL OR invoice_date <= $5)
            ORDER BY invoice_date DESC, invoice_number DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(company_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.client_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(filter.per_page)
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(failed("list invoices"))?;

        timer.observe_duration();

        Ok(invoices)
    }

    #[instrument(skip(self, filter), fields(company_id = %company_id))]
    async fn count_invoices(
        &self,
        company_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM invoices
            WHERE company_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR client_id = $3)
              AND ($4::date IS NULL OR invoice_date >= $4)
              AND ($5::date IS NULL OR invoice_date <= $5)
            "#,
        )
        .bind(company_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.client_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("count invoices"))
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn count_invoices_created_since(
        &self,
        company_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM invoices WHERE company_id = $1 AND created_utc >= $2",
        )
        .bind(company_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("count invoices"))
    }

    /// Update a draft invoice.
    #[instrument(skip(self, input), fields(company_id = %company_id, invoice_id = %invoice_id))]
    async fn update_invoice(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let mut tx = self.begin().await?;
        if !Self::lock_draft(&mut tx, company_id, invoice_id).await? {
            return Ok(None);
        }

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET client_id = COALESCE($3, client_id),
                invoice_date = COALESCE($4, invoice_date),
                due_date = COALESCE($5, due_date),
                notes = COALESCE($6, notes),
                internal_notes = COALESCE($7, internal_notes),
                updated_utc = NOW()
            WHERE company_id = $1 AND invoice_id = $2 AND status = 'draft'
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(invoice_id)
        .bind(input.client_id)
        .bind(input.invoice_date)
        .bind(input.due_date)
        .bind(&input.notes)
        .bind(&input.internal_notes)
        .fetch_optional(&mut *tx)
        .await
        .map_err(failed("update invoice"))?;

        Self::commit(tx).await?;
        timer.observe_duration();

        if let Some(ref inv) = invoice {
            info!(invoice_id = %inv.invoice_id, "Invoice updated");
        }

        Ok(invoice)
    }

    /// Apply a status change only if the invoice still has the expected
    /// previous status.
    #[instrument(skip(self, change), fields(company_id = %company_id, invoice_id = %invoice_id, from = %change.from, to = %change.to))]
    async fn apply_status_change(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        change: &StatusChange,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["apply_status_change"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = $4,
                sent_utc = COALESCE($5, sent_utc),
                payment_reference = COALESCE(payment_reference, $6),
                paid_date = COALESCE($7, paid_date),
                paid_amount = COALESCE($8, paid_amount),
                updated_utc = NOW()
            WHERE company_id = $1 AND invoice_id = $2 AND status = $3
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(invoice_id)
        .bind(change.from.as_str())
        .bind(change.to.as_str())
        .bind(change.sent_utc)
        .bind(&change.payment_reference)
        .bind(change.paid_date)
        .bind(change.paid_amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("change invoice status"))?;

        timer.observe_duration();

        match invoice {
            Some(inv) => {
                info!(invoice_number = %inv.invoice_number, status = %inv.status, "Invoice status changed");
                Ok(Some(inv))
            }
            None => match self.get_invoice(company_id, invoice_id).await? {
                Some(current) => {
                    warn!(current = %current.status, "Invoice status changed concurrently");
                    Err(AppError::Conflict(anyhow::anyhow!(
                        "Invoice {} changed from {} to {} concurrently",
                        current.invoice_number,
                        change.from,
                        current.status
                    )))
                }
                None => Ok(None),
            },
        }
    }

    #[instrument(skip(self), fields(company_id = %company_id, today = %today))]
    async fn promote_overdue(&self, company_id: Uuid, today: NaiveDate) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = 'overdue', updated_utc = NOW()
            WHERE company_id = $1 AND status = 'sent' AND due_date < $2
            "#,
        )
        .bind(company_id)
        .bind(today)
        .execute(&self.pool)
        .await
        .map_err(failed("promote overdue invoices"))?;

        let promoted = result.rows_affected();
        if promoted > 0 {
            info!(promoted = promoted, "Invoices marked overdue");
        }

        Ok(promoted)
    }

    // -------------------------------------------------------------------------
    // Line Item Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(company_id = %company_id, invoice_id = %invoice_id))]
    async fn get_line_items(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<LineItem>, AppError> {
        sqlx::query_as::<_, LineItem>(&format!(
            r#"
            SELECT {LINE_ITEM_COLUMNS}
            FROM line_items
            WHERE company_id = $1 AND invoice_id = $2
            ORDER BY position
            "#
        ))
        .bind(company_id)
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("get line items"))
    }

    #[instrument(skip(self, input), fields(company_id = %company_id, invoice_id = %invoice_id))]
    async fn add_line_item(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        input: &NewLineItem,
    ) -> Result<Option<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["add_line_item"])
            .start_timer();

        let mut tx = self.begin().await?;
        if !Self::lock_draft(&mut tx, company_id, invoice_id).await? {
            return Ok(None);
        }

        let position = sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM line_items WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(failed("get next line position"))?;

        let item = Self::insert_line(&mut tx, company_id, invoice_id, position, input).await?;
        Self::recompute_totals(&mut tx, invoice_id).await?;
        Self::commit(tx).await?;

        timer.observe_duration();

        info!(line_item_id = %item.line_item_id, "Line item added");

        Ok(Some(item))
    }

    #[instrument(skip(self, input), fields(company_id = %company_id, invoice_id = %invoice_id, line_item_id = %line_item_id))]
    async fn update_line_item(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        line_item_id: Uuid,
        input: &UpdateLineItem,
    ) -> Result<Option<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_line_item"])
            .start_timer();

        let mut tx = self.begin().await?;
        if !Self::lock_draft(&mut tx, company_id, invoice_id).await? {
            return Ok(None);
        }

        let existing = sqlx::query_as::<_, LineItem>(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items WHERE invoice_id = $1 AND line_item_id = $2"
        ))
        .bind(invoice_id)
        .bind(line_item_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(failed("get line item"))?;

        let Some(mut item) = existing else {
            return Ok(None);
        };
        input.apply_to(&mut item)?;

        let item = sqlx::query_as::<_, LineItem>(&format!(
            r#"
            UPDATE line_items
            SET description = $2, quantity = $3, unit = $4, unit_price = $5,
                tax_rate = $6, line_total = $7, line_tax = $8
            WHERE line_item_id = $1
            RETURNING {LINE_ITEM_COLUMNS}
            "#
        ))
        .bind(line_item_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(item.unit_price)
        .bind(item.tax_rate)
        .bind(item.line_total)
        .bind(item.line_tax)
        .fetch_one(&mut *tx)
        .await
        .map_err(failed("update line item"))?;

        Self::recompute_totals(&mut tx, invoice_id).await?;
        Self::commit(tx).await?;

        timer.observe_duration();

        info!("Line item updated");

        Ok(Some(item))
    }

    #[instrument(skip(self), fields(company_id = %company_id, invoice_id = %invoice_id, line_item_id = %line_item_id))]
    async fn remove_line_item(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        line_item_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["remove_line_item"])
            .start_timer();

        let mut tx = self.begin().await?;
        if !Self::lock_draft(&mut tx, company_id, invoice_id).await? {
            return Ok(false);
        }

        let result = sqlx::query("DELETE FROM line_items WHERE invoice_id = $1 AND line_item_id = $2")
            .bind(invoice_id)
            .bind(line_item_id)
            .execute(&mut *tx)
            .await
            .map_err(failed("remove line item"))?;

        let removed = result.rows_affected() > 0;
        if removed {
            Self::recompute_totals(&mut tx, invoice_id).await?;
        }
        Self::commit(tx).await?;

        timer.observe_duration();

        if removed {
            info!("Line item removed");
        }

        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Activity Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(user_id = %input.user_id, action = %input.action))]
    async fn record_activity(&self, input: &NewActivity) -> Result<ActivityLog, AppError> {
        sqlx::query_as::<_, ActivityLog>(&format!(
            r#"
            INSERT INTO activity_logs (activity_id, user_id, action, entity_type, entity_id, details, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(&input.action)
        .bind(&input.entity_type)
        .bind(input.entity_id)
        .bind(&input.details)
        .bind(&input.ip_address)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("record activity"))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_activity(&self, user_id: Uuid, limit: i64) -> Result<Vec<ActivityLog>, AppError> {
        sqlx::query_as::<_, ActivityLog>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM activity_logs
            WHERE user_id = $1
            ORDER BY created_utc DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("list activity"))
    }
}
