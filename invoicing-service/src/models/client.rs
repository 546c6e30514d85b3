//! Client (customer) model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of client being invoiced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    Company,
    Individual,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Company => "company",
            ClientType::Individual => "individual",
        }
    }
}

/// A customer of the company.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Client {
    pub client_id: Uuid,
    pub company_id: Uuid,
    #[schema(example = "UAB Klientas")]
    pub name: String,
    pub legal_name: Option<String>,
    #[schema(example = "company")]
    pub client_type: String,
    pub company_code: Option<String>,
    pub vat_code: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Per-client invoice totals.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ClientBalance {
    /// Sum of paid invoices.
    pub total_invoiced: Decimal,
    /// Sum of sent and overdue invoices.
    pub outstanding: Decimal,
}

/// Input for creating a client.
#[derive(Debug, Clone)]
pub struct CreateClient {
    pub company_id: Uuid,
    pub name: String,
    pub legal_name: Option<String>,
    pub client_type: ClientType,
    pub company_code: Option<String>,
    pub vat_code: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
}

/// Partial update of a client.
#[derive(Debug, Clone, Default)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub legal_name: Option<String>,
    pub client_type: Option<ClientType>,
    pub company_code: Option<String>,
    pub vat_code: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateClient {
    pub fn apply_to(&self, client: &mut Client) {
        fn set(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                *target = Some(v.clone());
            }
        }

        if let Some(name) = &self.name {
            client.name = name.clone();
        }
        set(&mut client.legal_name, &self.legal_name);
        if let Some(client_type) = self.client_type {
            client.client_type = client_type.as_str().to_string();
        }
        set(&mut client.company_code, &self.company_code);
        set(&mut client.vat_code, &self.vat_code);
        set(&mut client.contact_person, &self.contact_person);
        set(&mut client.email, &self.email);
        set(&mut client.phone, &self.phone);
        set(&mut client.address, &self.address);
        set(&mut client.city, &self.city);
        set(&mut client.postal_code, &self.postal_code);
        if let Some(country) = &self.country {
            client.country = country.clone();
        }
        set(&mut client.notes, &self.notes);
        if let Some(active) = self.is_active {
            client.is_active = active;
        }
    }
}

/// Filter parameters for listing clients.
#[derive(Debug, Clone, Default)]
pub struct ListClientsFilter {
    pub search: Option<String>,
    pub include_inactive: bool,
}

impl ListClientsFilter {
    /// Case-insensitive match on name, company code or email.
    pub fn matches(&self, client: &Client) -> bool {
        if !self.include_inactive && !client.is_active {
            return false;
        }
        let Some(term) = self.search.as_deref().map(str::to_lowercase) else {
            return true;
        };
        [Some(&client.name), client.company_code.as_ref(), client.email.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Result of deleting a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRemoval {
    /// The client has invoices and was deactivated instead.
    Deactivated,
    Deleted,
}
