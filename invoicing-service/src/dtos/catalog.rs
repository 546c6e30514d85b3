use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::non_blank;
use crate::models::{
    ClientType, CreateClient, CreateProduct, ListClientsFilter, ListProductsFilter, ProductType,
    TaxRate, UpdateClient, UpdateProduct, DEFAULT_UNIT,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CatalogQuery {
    /// Case-insensitive search term.
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl From<CatalogQuery> for ListClientsFilter {
    fn from(q: CatalogQuery) -> Self {
        ListClientsFilter {
            search: non_blank(q.search),
            include_inactive: q.include_inactive,
        }
    }
}

impl From<CatalogQuery> for ListProductsFilter {
    fn from(q: CatalogQuery) -> Self {
        ListProductsFilter {
            search: non_blank(q.search),
            include_inactive: q.include_inactive,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    #[schema(example = "UAB Klientas")]
    pub name: String,
    #[validate(length(max = 200))]
    pub legal_name: Option<String>,
    pub client_type: Option<ClientType>,
    #[validate(length(max = 20))]
    pub company_code: Option<String>,
    #[validate(length(max = 20))]
    pub vat_code: Option<String>,
    #[validate(length(max = 200))]
    pub contact_person: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "buhalterija@klientas.lt")]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    pub notes: Option<String>,
}

impl From<CreateClientRequest> for CreateClient {
    fn from(req: CreateClientRequest) -> Self {
        CreateClient {
            // Set from the caller's company.
            company_id: Uuid::nil(),
            name: req.name.trim().to_string(),
            legal_name: non_blank(req.legal_name),
            client_type: req.client_type.unwrap_or(ClientType::Company),
            company_code: non_blank(req.company_code),
            vat_code: non_blank(req.vat_code),
            contact_person: non_blank(req.contact_person),
            email: non_blank(req.email),
            phone: non_blank(req.phone),
            address: non_blank(req.address),
            city: non_blank(req.city),
            postal_code: non_blank(req.postal_code),
            country: non_blank(req.country),
            notes: non_blank(req.notes),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub legal_name: Option<String>,
    pub client_type: Option<ClientType>,
    #[validate(length(max = 20))]
    pub company_code: Option<String>,
    #[validate(length(max = 20))]
    pub vat_code: Option<String>,
    #[validate(length(max = 200))]
    pub contact_person: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl From<UpdateClientRequest> for UpdateClient {
    fn from(req: UpdateClientRequest) -> Self {
        UpdateClient {
            name: non_blank(req.name),
            legal_name: req.legal_name,
            client_type: req.client_type,
            company_code: req.company_code,
            vat_code: req.vat_code,
            contact_person: req.contact_person,
            email: req.email,
            phone: req.phone,
            address: req.address,
            city: req.city,
            postal_code: req.postal_code,
            country: non_blank(req.country),
            notes: req.notes,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientRemovalResponse {
    pub client_id: Uuid,
    /// False when the client had invoices and was only deactivated.
    pub deleted: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    #[schema(example = "Konsultacija")]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub sku: Option<String>,
    pub product_type: Option<ProductType>,
    #[schema(value_type = String, example = "50.00")]
    pub unit_price: Decimal,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "val.")]
    pub unit: Option<String>,
    #[schema(example = 21)]
    pub tax_rate: Option<i32>,
}

impl From<CreateProductRequest> for CreateProduct {
    fn from(req: CreateProductRequest) -> Self {
        CreateProduct {
            // Set from the caller's company.
            company_id: Uuid::nil(),
            name: req.name.trim().to_string(),
            description: non_blank(req.description),
            sku: non_blank(req.sku),
            product_type: req.product_type.unwrap_or(ProductType::Service),
            unit_price: req.unit_price,
            unit: non_blank(req.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            tax_rate: req.tax_rate.unwrap_or_else(|| TaxRate::default().percent()),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub sku: Option<String>,
    pub product_type: Option<ProductType>,
    #[schema(value_type = Option<String>)]
    pub unit_price: Option<Decimal>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    pub tax_rate: Option<i32>,
    pub is_active: Option<bool>,
}

impl From<UpdateProductRequest> for UpdateProduct {
    fn from(req: UpdateProductRequest) -> Self {
        UpdateProduct {
            name: non_blank(req.name),
            description: req.description,
            sku: req.sku,
            product_type: req.product_type,
            unit_price: req.unit_price,
            unit: non_blank(req.unit),
            tax_rate: req.tax_rate,
            is_active: req.is_active,
        }
    }
}
