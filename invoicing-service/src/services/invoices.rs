//! Invoice workflows: drafting, line items, delivery, payment and cancellation.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    decimal_places, ensure_amount_in_range, payment_reference, transition, InvoiceError,
    InvoiceEvent, ResourceKind, CURRENCY_DECIMAL_PLACES, MAX_QUANTITY, MAX_UNIT_PRICE,
    QUANTITY_DECIMAL_PLACES,
};
use crate::models::{
    Client, Company, CreateInvoice, Invoice, InvoiceStatus, LineItem, ListInvoicesFilter,
    NewLineItem, StatusChange, TaxRate, UpdateInvoice, UpdateLineItem, DEFAULT_UNIT,
};
use crate::services::activity::{self, Actor};
use crate::services::email::EmailProvider;
use crate::services::entitlement::EntitlementChecker;
use crate::services::metrics::{
    EMAILS_TOTAL, INVOICES_TOTAL, INVOICE_AMOUNT_TOTAL, LINE_ITEM_MUTATIONS_TOTAL,
    PAYMENT_AMOUNT_TOTAL,
};
use crate::services::pdf::{render_invoice_pdf, InvoiceDocument};
use crate::services::store::InvoicingStore;
use crate::services::templates;

const CURRENCY: &str = "EUR";

/// A line item as entered by the user. Missing fields are copied from the
/// product when one is referenced.
#[derive(Debug, Clone, Default)]
pub struct ItemInput {
    pub product_id: Option<Uuid>,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub unit_price: Option<Decimal>,
    pub tax_rate: Option<i32>,
}

/// Input for drafting an invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub client_id: Uuid,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub internal_notes: Option<String>,
    pub items: Vec<ItemInput>,
}

/// Invoice with its client and items.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub client: Client,
    pub items: Vec<LineItem>,
}

/// Payment details; both default from the invoice.
#[derive(Debug, Clone, Default)]
pub struct PaymentInput {
    pub paid_date: Option<NaiveDate>,
    pub paid_amount: Option<Decimal>,
}

fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Invoice not found"))
}

fn money_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

fn validate_amounts(quantity: Decimal, unit_price: Decimal, tax_rate: i32) -> Result<(), InvoiceError> {
    if quantity <= Decimal::ZERO {
        return Err(InvoiceError::InvalidQuantity);
    }
    if quantity > MAX_QUANTITY {
        return Err(InvoiceError::QuantityTooLarge { max: MAX_QUANTITY });
    }
    if decimal_places(quantity) > QUANTITY_DECIMAL_PLACES {
        return Err(InvoiceError::TooManyDecimals {
            field: "Quantity",
            places: QUANTITY_DECIMAL_PLACES,
        });
    }
    validate_unit_price(unit_price)?;
    if TaxRate::from_percent(tax_rate).is_none() {
        return Err(InvoiceError::InvalidTaxRate(tax_rate));
    }
    Ok(())
}

/// Sum of stored line amounts must fit the invoice total column.
fn ensure_total_fits(amounts: impl IntoIterator<Item = Decimal>) -> Result<(), InvoiceError> {
    let total = amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(amount))
        .ok_or(InvoiceError::AmountOutOfRange)?;
    ensure_amount_in_range(total)
}

/// Unit price as stored in NUMERIC(12,2). Shared with the product catalog.
pub(crate) fn validate_unit_price(unit_price: Decimal) -> Result<(), InvoiceError> {
    if unit_price < Decimal::ZERO {
        return Err(InvoiceError::InvalidUnitPrice);
    }
    if unit_price > MAX_UNIT_PRICE {
        return Err(InvoiceError::UnitPriceTooLarge { max: MAX_UNIT_PRICE });
    }
    if decimal_places(unit_price) > CURRENCY_DECIMAL_PLACES {
        return Err(InvoiceError::TooManyDecimals {
            field: "Unit price",
            places: CURRENCY_DECIMAL_PLACES,
        });
    }
    Ok(())
}

fn due_date_for(company: &Company, invoice_date: NaiveDate) -> NaiveDate {
    invoice_date + Duration::days(i64::from(company.payment_terms))
}

#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn InvoicingStore>,
    email: Arc<dyn EmailProvider>,
    entitlements: EntitlementChecker,
}

impl InvoiceService {
    pub fn new(
        store: Arc<dyn InvoicingStore>,
        email: Arc<dyn EmailProvider>,
        entitlements: EntitlementChecker,
    ) -> Self {
        Self {
            store,
            email,
            entitlements,
        }
    }

    async fn load(&self, company_id: Uuid, invoice_id: Uuid) -> Result<Invoice, AppError> {
        self.store
            .get_invoice(company_id, invoice_id)
            .await?
            .ok_or_else(not_found)
    }

    async fn load_client(&self, company_id: Uuid, client_id: Uuid) -> Result<Client, AppError> {
        self.store
            .get_client(company_id, client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))
    }

    async fn active_client(&self, company_id: Uuid, client_id: Uuid) -> Result<Client, AppError> {
        let client = self.load_client(company_id, client_id).await?;
        if !client.is_active {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Client '{}' is inactive",
                client.name
            )));
        }
        Ok(client)
    }

    /// Turn user input into a stored line, copying from the product when given.
    async fn resolve_item(&self, company_id: Uuid, input: &ItemInput) -> Result<NewLineItem, AppError> {
        let product = match input.product_id {
            Some(product_id) => Some(
                self.store
                    .get_product(company_id, product_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))?,
            ),
            None => None,
        };

        let description = input
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| {
                product
                    .as_ref()
                    .map(|p| p.description.clone().filter(|d| !d.is_empty()).unwrap_or_else(|| p.name.clone()))
            })
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Line item description is required")))?;
        let unit = input
            .unit
            .clone()
            .or_else(|| product.as_ref().map(|p| p.unit.clone()))
            .unwrap_or_else(|| DEFAULT_UNIT.to_string());
        let unit_price = input
            .unit_price
            .or_else(|| product.as_ref().map(|p| p.unit_price))
            .unwrap_or(Decimal::ZERO);
        let tax_rate = input
            .tax_rate
            .or_else(|| product.as_ref().map(|p| p.tax_rate))
            .unwrap_or_else(|| TaxRate::default().percent());

        validate_amounts(input.quantity, unit_price, tax_rate)?;

        NewLineItem::new(
            input.product_id,
            description,
            input.quantity,
            unit,
            unit_price,
            tax_rate,
        )
        .map_err(AppError::from)
    }

    /// Promote past-due sent invoices. Safe to call on every read.
    #[instrument(skip(self))]
    pub async fn refresh_overdue(&self, company_id: Uuid) -> Result<u64, AppError> {
        let today = Utc::now().date_naive();
        let promoted = self.store.promote_overdue(company_id, today).await?;
        if promoted > 0 {
            INVOICES_TOTAL
                .with_label_values(&[InvoiceStatus::Overdue.as_str()])
                .inc_by(promoted as f64);
            info!(company_id = %company_id, promoted, "Invoices marked overdue");
        }
        Ok(promoted)
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        filter: &ListInvoicesFilter,
    ) -> Result<(Vec<Invoice>, i64), AppError> {
        self.refresh_overdue(company_id).await?;
        let invoices = self.store.list_invoices(company_id, filter).await?;
        let total = self.store.count_invoices(company_id, filter).await?;
        Ok((invoices, total))
    }

    pub async fn get(&self, company_id: Uuid, invoice_id: Uuid) -> Result<InvoiceDetail, AppError> {
        self.refresh_overdue(company_id).await?;
        let invoice = self.load(company_id, invoice_id).await?;
        let client = self.load_client(company_id, invoice.client_id).await?;
        let items = self.store.get_line_items(company_id, invoice_id).await?;
        Ok(InvoiceDetail {
            invoice,
            client,
            items,
        })
    }

    #[instrument(skip(self, actor, input), fields(company_id = %actor.company_id(), client_id = %input.client_id))]
    pub async fn create(&self, actor: &Actor, input: NewInvoice) -> Result<InvoiceDetail, AppError> {
        self.entitlements
            .ensure_can_create(&actor.company, ResourceKind::Invoice)
            .await?;
        let company_id = actor.company_id();
        self.active_client(company_id, input.client_id).await?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            items.push(self.resolve_item(company_id, item).await?);
        }
        ensure_total_fits(items.iter().map(|item| item.line_total + item.line_tax))?;

        let invoice_date = input.invoice_date.unwrap_or_else(|| Utc::now().date_naive());
        let due_date = input
            .due_date
            .unwrap_or_else(|| due_date_for(&actor.company, invoice_date));
        if due_date < invoice_date {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Due date cannot be before the invoice date"
            )));
        }

        let invoice = self
            .store
            .create_invoice(&CreateInvoice {
                company_id,
                user_id: actor.user_id,
                client_id: input.client_id,
                invoice_date,
                due_date,
                notes: input.notes.or_else(|| actor.company.invoice_notes.clone()),
                internal_notes: input.internal_notes,
                items,
            })
            .await?;

        INVOICES_TOTAL
            .with_label_values(&[InvoiceStatus::Draft.as_str()])
            .inc();
        info!(invoice_id = %invoice.invoice_id, invoice_number = %invoice.invoice_number, "Invoice created");
        activity::record(
            self.store.as_ref(),
            actor
                .activity("invoice_create")
                .entity("invoice", invoice.invoice_id)
                .details(invoice.invoice_number.clone()),
        )
        .await;

        self.get(company_id, invoice.invoice_id).await
    }

    #[instrument(skip(self, actor, input), fields(company_id = %actor.company_id()))]
    pub async fn update(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
        mut input: UpdateInvoice,
    ) -> Result<InvoiceDetail, AppError> {
        let company_id = actor.company_id();
        let current = self.load(company_id, invoice_id).await?;
        transition(current.status(), InvoiceEvent::EditLineItems)?;
        if let Some(client_id) = input.client_id {
            self.active_client(company_id, client_id).await?;
        }
        if let (Some(date), None) = (input.invoice_date, input.due_date) {
            input.due_date = Some(due_date_for(&actor.company, date));
        }
        let invoice_date = input.invoice_date.unwrap_or(current.invoice_date);
        let due_date = input.due_date.unwrap_or(current.due_date);
        if due_date < invoice_date {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Due date cannot be before the invoice date"
            )));
        }

        self.store
            .update_invoice(company_id, invoice_id, &input)
            .await?
            .ok_or_else(not_found)?;

        info!(invoice_id = %invoice_id, "Invoice updated");
        activity::record(
            self.store.as_ref(),
            actor.activity("invoice_update").entity("invoice", invoice_id),
        )
        .await;
        self.get(company_id, invoice_id).await
    }

    #[instrument(skip(self, actor, input), fields(company_id = %actor.company_id()))]
    pub async fn add_item(&self, actor: &Actor, invoice_id: Uuid, input: &ItemInput) -> Result<LineItem, AppError> {
        let company_id = actor.company_id();
        let item = self.resolve_item(company_id, input).await?;
        let invoice = self.load(company_id, invoice_id).await?;
        ensure_total_fits([invoice.total, item.line_total + item.line_tax])?;
        let stored = self
            .store
            .add_line_item(company_id, invoice_id, &item)
            .await?
            .ok_or_else(not_found)?;
        LINE_ITEM_MUTATIONS_TOTAL.with_label_values(&["add"]).inc();
        info!(invoice_id = %invoice_id, line_item_id = %stored.line_item_id, "Line item added");
        Ok(stored)
    }

    #[instrument(skip(self, actor, input), fields(company_id = %actor.company_id()))]
    pub async fn update_item(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
        line_item_id: Uuid,
        input: &UpdateLineItem,
    ) -> Result<LineItem, AppError> {
        let company_id = actor.company_id();
        let current = self
            .store
            .get_line_items(company_id, invoice_id)
            .await?
            .into_iter()
            .find(|item| item.line_item_id == line_item_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Line item not found")))?;

        let mut merged = input.merged(&current);
        validate_amounts(merged.quantity, merged.unit_price, merged.tax_rate)?;
        if merged.description.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Line item description is required")));
        }
        input.apply_to(&mut merged)?;
        let invoice = self.load(company_id, invoice_id).await?;
        ensure_total_fits([
            invoice.total - current.line_total - current.line_tax,
            merged.line_total + merged.line_tax,
        ])?;

        let stored = self
            .store
            .update_line_item(company_id, invoice_id, line_item_id, input)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Line item not found")))?;
        LINE_ITEM_MUTATIONS_TOTAL.with_label_values(&["update"]).inc();
        info!(invoice_id = %invoice_id, line_item_id = %line_item_id, "Line item updated");
        Ok(stored)
    }

    #[instrument(skip(self, actor), fields(company_id = %actor.company_id()))]
    pub async fn remove_item(&self, actor: &Actor, invoice_id: Uuid, line_item_id: Uuid) -> Result<(), AppError> {
        let company_id = actor.company_id();
        // Surfaces the not-editable error before the item lookup.
        let invoice = self.load(company_id, invoice_id).await?;
        transition(invoice.status(), InvoiceEvent::EditLineItems)?;

        if !self
            .store
            .remove_line_item(company_id, invoice_id, line_item_id)
            .await?
        {
            return Err(AppError::NotFound(anyhow::anyhow!("Line item not found")));
        }
        LINE_ITEM_MUTATIONS_TOTAL.with_label_values(&["remove"]).inc();
        info!(invoice_id = %invoice_id, line_item_id = %line_item_id, "Line item removed");
        Ok(())
    }

    /// Render the invoice PDF. Returns the file name and bytes.
    pub async fn render_pdf(&self, company: &Company, invoice_id: Uuid) -> Result<(String, Vec<u8>), AppError> {
        let detail = self.get(company.company_id, invoice_id).await?;
        let bytes = render_invoice_pdf(&InvoiceDocument {
            company,
            client: &detail.client,
            invoice: &detail.invoice,
            items: &detail.items,
        })?;
        Ok((format!("{}.pdf", detail.invoice.invoice_number), bytes))
    }

    /// Email the invoice with its PDF, then mark it sent. A failed delivery
    /// leaves the invoice in draft.
    #[instrument(skip(self, actor), fields(company_id = %actor.company_id()))]
    pub async fn send(&self, actor: &Actor, invoice_id: Uuid) -> Result<InvoiceDetail, AppError> {
        let company_id = actor.company_id();
        let mut detail = self.get(company_id, invoice_id).await?;
        let from = detail.invoice.status();
        let to = transition(from, InvoiceEvent::Send)?;

        if detail.items.is_empty() {
            return Err(InvoiceError::EmptyInvoice.into());
        }
        let recipient = detail
            .client
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!(
                    "Client '{}' has no email address",
                    detail.client.name
                ))
            })?;

        let reference = detail
            .invoice
            .payment_reference
            .clone()
            .unwrap_or_else(|| payment_reference(invoice_id));
        detail.invoice.payment_reference = Some(reference.clone());

        let pdf = render_invoice_pdf(&InvoiceDocument {
            company: &actor.company,
            client: &detail.client,
            invoice: &detail.invoice,
            items: &detail.items,
        })?;
        let message = templates::invoice_email(&actor.company, &detail.invoice, &recipient, pdf);
        if let Err(e) = self.email.send(&message).await {
            EMAILS_TOTAL.with_label_values(&["invoice", "failed"]).inc();
            warn!(invoice_id = %invoice_id, error = %e, "Invoice email failed, invoice left in draft");
            return Err(e.into());
        }
        EMAILS_TOTAL.with_label_values(&["invoice", "sent"]).inc();

        let mut change = StatusChange::new(from, to);
        change.sent_utc = Some(Utc::now());
        change.payment_reference = Some(reference);
        let invoice = self
            .store
            .apply_status_change(company_id, invoice_id, &change)
            .await?
            .ok_or_else(not_found)?;

        INVOICES_TOTAL.with_label_values(&[to.as_str()]).inc();
        INVOICE_AMOUNT_TOTAL
            .with_label_values(&[CURRENCY])
            .inc_by(money_f64(invoice.total));
        info!(invoice_id = %invoice_id, to = %recipient, "Invoice sent");
        activity::record(
            self.store.as_ref(),
            actor
                .activity("invoice_send")
                .entity("invoice", invoice_id)
                .details(format!("{} -> {}", invoice.invoice_number, recipient)),
        )
        .await;

        Ok(InvoiceDetail {
            invoice,
            client: detail.client,
            items: detail.items,
        })
    }

    #[instrument(skip(self, actor, input), fields(company_id = %actor.company_id()))]
    pub async fn record_payment(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
        input: PaymentInput,
    ) -> Result<Invoice, AppError> {
        let company_id = actor.company_id();
        self.refresh_overdue(company_id).await?;
        let invoice = self.load(company_id, invoice_id).await?;
        let from = invoice.status();
        let to = transition(from, InvoiceEvent::RecordPayment)?;

        let paid_amount = input.paid_amount.unwrap_or(invoice.total);
        if paid_amount < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!("Paid amount cannot be negative")));
        }
        ensure_amount_in_range(paid_amount)?;
        if decimal_places(paid_amount) > CURRENCY_DECIMAL_PLACES {
            return Err(InvoiceError::TooManyDecimals {
                field: "Paid amount",
                places: CURRENCY_DECIMAL_PLACES,
            }
            .into());
        }

        let mut change = StatusChange::new(from, to);
        change.paid_date = Some(input.paid_date.unwrap_or_else(|| Utc::now().date_naive()));
        change.paid_amount = Some(paid_amount);
        let invoice = self
            .store
            .apply_status_change(company_id, invoice_id, &change)
            .await?
            .ok_or_else(not_found)?;

        INVOICES_TOTAL.with_label_values(&[to.as_str()]).inc();
        PAYMENT_AMOUNT_TOTAL
            .with_label_values(&[CURRENCY])
            .inc_by(money_f64(paid_amount));
        info!(invoice_id = %invoice_id, amount = %paid_amount, "Payment recorded");
        activity::record(
            self.store.as_ref(),
            actor
                .activity("invoice_paid")
                .entity("invoice", invoice_id)
                .details(format!("{} {:.2}", invoice.invoice_number, paid_amount)),
        )
        .await;
        Ok(invoice)
    }

    #[instrument(skip(self, actor), fields(company_id = %actor.company_id()))]
    pub async fn cancel(&self, actor: &Actor, invoice_id: Uuid) -> Result<Invoice, AppError> {
        let company_id = actor.company_id();
        self.refresh_overdue(company_id).await?;
        let invoice = self.load(company_id, invoice_id).await?;
        let from = invoice.status();
        let to = transition(from, InvoiceEvent::Cancel)?;

        let invoice = self
            .store
            .apply_status_change(company_id, invoice_id, &StatusChange::new(from, to))
            .await?
            .ok_or_else(not_found)?;

        INVOICES_TOTAL.with_label_values(&[to.as_str()]).inc();
        info!(invoice_id = %invoice_id, from = %from, "Invoice cancelled");
        activity::record(
            self.store.as_ref(),
            actor
                .activity("invoice_cancel")
                .entity("invoice", invoice_id)
                .details(invoice.invoice_number.clone()),
        )
        .await;
        Ok(invoice)
    }

    /// Copy an invoice under a new number, dated today, as a draft.
    #[instrument(skip(self, actor), fields(company_id = %actor.company_id()))]
    pub async fn duplicate(&self, actor: &Actor, invoice_id: Uuid) -> Result<InvoiceDetail, AppError> {
        self.entitlements
            .ensure_can_create(&actor.company, ResourceKind::Invoice)
            .await?;
        let company_id = actor.company_id();
        let source = self.get(company_id, invoice_id).await?;

        let today = Utc::now().date_naive();
        let invoice = self
            .store
            .create_invoice(&CreateInvoice {
                company_id,
                user_id: actor.user_id,
                client_id: source.invoice.client_id,
                invoice_date: today,
                due_date: due_date_for(&actor.company, today),
                notes: source.invoice.notes.clone(),
                internal_notes: source.invoice.internal_notes.clone(),
                items: source
                    .items
                    .iter()
                    .map(NewLineItem::from_existing)
                    .collect::<Result<_, _>>()?,
            })
            .await?;

        INVOICES_TOTAL
            .with_label_values(&[InvoiceStatus::Draft.as_str()])
            .inc();
        info!(
            source = %source.invoice.invoice_number,
            invoice_number = %invoice.invoice_number,
            "Invoice duplicated"
        );
        activity::record(
            self.store.as_ref(),
            actor
                .activity("invoice_duplicate")
                .entity("invoice", invoice.invoice_id)
                .details(format!("{} -> {}", source.invoice.invoice_number, invoice.invoice_number)),
        )
        .await;

        self.get(company_id, invoice.invoice_id).await
    }

    /// Email a payment reminder for an outstanding invoice.
    #[instrument(skip(self, actor), fields(company_id = %actor.company_id()))]
    pub async fn remind(&self, actor: &Actor, invoice_id: Uuid) -> Result<(), AppError> {
        let detail = self.get(actor.company_id(), invoice_id).await?;
        if !detail.invoice.status().is_outstanding() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Only sent or overdue invoices can be reminded, this one is {}",
                detail.invoice.status()
            )));
        }
        let recipient = detail
            .client
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Client has no email address")))?;

        let message = templates::payment_reminder_email(&actor.company, &detail.invoice, &recipient);
        if let Err(e) = self.email.send(&message).await {
            EMAILS_TOTAL.with_label_values(&["reminder", "failed"]).inc();
            return Err(e.into());
        }
        EMAILS_TOTAL.with_label_values(&["reminder", "sent"]).inc();

        info!(invoice_id = %invoice_id, to = %recipient, "Payment reminder sent");
        activity::record(
            self.store.as_ref(),
            actor
                .activity("invoice_remind")
                .entity("invoice", invoice_id)
                .details(detail.invoice.invoice_number.clone()),
        )
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_validated() {
        use rust_decimal_macros::dec;
        assert_eq!(validate_amounts(dec!(0), dec!(1), 21), Err(InvoiceError::InvalidQuantity));
        assert_eq!(validate_amounts(dec!(1), dec!(-1), 21), Err(InvoiceError::InvalidUnitPrice));
        assert_eq!(validate_amounts(dec!(1), dec!(1), 20), Err(InvoiceError::InvalidTaxRate(20)));
        assert!(validate_amounts(dec!(0.5), dec!(0), 0).is_ok());
        assert!(validate_amounts(dec!(999999999.999), dec!(9999999999.99), 21).is_ok());
        assert!(matches!(
            validate_amounts(dec!(1000000000), dec!(1), 21),
            Err(InvoiceError::QuantityTooLarge { .. })
        ));
        assert!(matches!(
            validate_amounts(dec!(1), dec!(10000000000), 21),
            Err(InvoiceError::UnitPriceTooLarge { .. })
        ));
        assert_eq!(
            validate_amounts(dec!(1.0001), dec!(1), 21),
            Err(InvoiceError::TooManyDecimals {
                field: "Quantity",
                places: 3
            })
        );
        assert_eq!(
            validate_amounts(dec!(3), dec!(33.333), 9),
            Err(InvoiceError::TooManyDecimals {
                field: "Unit price",
                places: 2
            })
        );
    }
}
