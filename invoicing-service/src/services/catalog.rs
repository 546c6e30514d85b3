//! Client and product management with plan limits and audit entries.

use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{InvoiceError, ResourceKind};
use crate::models::{
    Client, ClientBalance, ClientRemoval, CreateClient, CreateProduct, InvoiceStatus,
    ListInvoicesFilter, Product, TaxRate, UpdateClient, UpdateProduct,
};
use crate::services::activity::{self, Actor};
use crate::services::entitlement::EntitlementChecker;
use crate::services::invoices::validate_unit_price;
use crate::services::store::InvoicingStore;

/// A client with its invoice balance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    #[serde(flatten)]
    pub balance: ClientBalance,
}

fn client_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Client not found"))
}

fn product_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Product not found"))
}

fn validate_product_fields(unit_price: Option<Decimal>, tax_rate: Option<i32>) -> Result<(), InvoiceError> {
    if let Some(unit_price) = unit_price {
        validate_unit_price(unit_price)?;
    }
    match tax_rate {
        Some(rate) if TaxRate::from_percent(rate).is_none() => Err(InvoiceError::InvalidTaxRate(rate)),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn InvoicingStore>,
    entitlements: EntitlementChecker,
}

impl CatalogService {
    pub fn new(store: Arc<dyn InvoicingStore>, entitlements: EntitlementChecker) -> Self {
        Self {
            store,
            entitlements,
        }
    }

    /// Paid total and outstanding total of a client's invoices.
    pub async fn client_balance(&self, company_id: Uuid, client_id: Uuid) -> Result<ClientBalance, AppError> {
        let filter = ListInvoicesFilter {
            client_id: Some(client_id),
            ..ListInvoicesFilter::all()
        };
        let invoices = self.store.list_invoices(company_id, &filter).await?;
        Ok(invoices.iter().fold(ClientBalance::default(), |mut acc, invoice| {
            match invoice.status() {
                InvoiceStatus::Paid => acc.total_invoiced += invoice.total,
                status if status.is_outstanding() => acc.outstanding += invoice.total,
                _ => {}
            }
            acc
        }))
    }

    pub async fn get_client(&self, company_id: Uuid, client_id: Uuid) -> Result<ClientDetail, AppError> {
        let client = self
            .store
            .get_client(company_id, client_id)
            .await?
            .ok_or_else(client_not_found)?;
        let balance = self.client_balance(company_id, client_id).await?;
        Ok(ClientDetail { client, balance })
    }

    #[instrument(skip(self, actor, input), fields(company_id = %actor.company_id()))]
    pub async fn create_client(&self, actor: &Actor, mut input: CreateClient) -> Result<Client, AppError> {
        self.entitlements
            .ensure_can_create(&actor.company, ResourceKind::Client)
            .await?;
        input.company_id = actor.company_id();
        let client = self.store.create_client(&input).await?;

        info!(client_id = %client.client_id, "Client created");
        activity::record(
            self.store.as_ref(),
            actor
                .activity("client_create")
                .entity("client", client.client_id)
                .details(client.name.clone()),
        )
        .await;
        Ok(client)
    }

    #[instrument(skip(self, actor, input), fields(company_id = %actor.company_id()))]
    pub async fn update_client(
        &self,
        actor: &Actor,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Client, AppError> {
        let client = self
            .store
            .update_client(actor.company_id(), client_id, input)
            .await?
            .ok_or_else(client_not_found)?;

        info!(client_id = %client_id, "Client updated");
        activity::record(
            self.store.as_ref(),
            actor.activity("client_update").entity("client", client_id),
        )
        .await;
        Ok(client)
    }

    #[instrument(skip(self, actor), fields(company_id = %actor.company_id()))]
    pub async fn delete_client(&self, actor: &Actor, client_id: Uuid) -> Result<ClientRemoval, AppError> {
        let removal = self
            .store
            .delete_client(actor.company_id(), client_id)
            .await?
            .ok_or_else(client_not_found)?;

        info!(client_id = %client_id, ?removal, "Client removed");
        activity::record(
            self.store.as_ref(),
            actor
                .activity("client_delete")
                .entity("client", client_id)
                .details(match removal {
                    ClientRemoval::Deactivated => "deactivated",
                    ClientRemoval::Deleted => "deleted",
                }),
        )
        .await;
        Ok(removal)
    }

    pub async fn get_product(&self, company_id: Uuid, product_id: Uuid) -> Result<Product, AppError> {
        self.store
            .get_product(company_id, product_id)
            .await?
            .ok_or_else(product_not_found)
    }

    #[instrument(skip(self, actor, input), fields(company_id = %actor.company_id()))]
    pub async fn create_product(&self, actor: &Actor, mut input: CreateProduct) -> Result<Product, AppError> {
        validate_product_fields(Some(input.unit_price), Some(input.tax_rate))?;
        self.entitlements
            .ensure_can_create(&actor.company, ResourceKind::Product)
            .await?;
        input.company_id = actor.company_id();
        let product = self.store.create_product(&input).await?;

        info!(product_id = %product.product_id, "Product created");
        activity::record(
            self.store.as_ref(),
            actor
                .activity("product_create")
                .entity("product", product.product_id)
                .details(product.name.clone()),
        )
        .await;
        Ok(product)
    }

    #[instrument(skip(self, actor, input), fields(company_id = %actor.company_id()))]
    pub async fn update_product(
        &self,
        actor: &Actor,
        product_id: Uuid,
        input: &UpdateProduct,
    ) -> Result<Product, AppError> {
        validate_product_fields(input.unit_price, input.tax_rate)?;
        let product = self
            .store
            .update_product(actor.company_id(), product_id, input)
            .await?
            .ok_or_else(product_not_found)?;

        info!(product_id = %product_id, "Product updated");
        activity::record(
            self.store.as_ref(),
            actor.activity("product_update").entity("product", product_id),
        )
        .await;
        Ok(product)
    }

    /// Products are never hard-deleted; line items may reference them.
    #[instrument(skip(self, actor), fields(company_id = %actor.company_id()))]
    pub async fn delete_product(&self, actor: &Actor, product_id: Uuid) -> Result<Product, AppError> {
        let product = self
            .store
            .deactivate_product(actor.company_id(), product_id)
            .await?
            .ok_or_else(product_not_found)?;

        info!(product_id = %product_id, "Product deactivated");
        activity::record(
            self.store.as_ref(),
            actor.activity("product_delete").entity("product", product_id),
        )
        .await;
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn product_fields_are_validated() {
        assert!(validate_product_fields(Some(dec!(10)), Some(21)).is_ok());
        assert!(validate_product_fields(None, None).is_ok());
        assert_eq!(
            validate_product_fields(Some(dec!(-1)), None),
            Err(InvoiceError::InvalidUnitPrice)
        );
        assert_eq!(
            validate_product_fields(None, Some(7)),
            Err(InvoiceError::InvalidTaxRate(7))
        );
        assert_eq!(
            validate_product_fields(Some(dec!(33.333)), None),
            Err(InvoiceError::TooManyDecimals {
                field: "Unit price",
                places: 2
            })
        );
        assert!(matches!(
            validate_product_fields(Some(dec!(10000000000)), None),
            Err(InvoiceError::UnitPriceTooLarge { .. })
        ));
        assert!(validate_product_fields(Some(dec!(33.330)), None).is_ok());
    }
}
