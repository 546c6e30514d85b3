//! Domain models for invoicing-service.

mod activity_log;
mod client;
mod company;
mod invoice;
mod line_item;
mod product;
mod tax_rate;
mod user;

pub use activity_log::{ActivityLog, NewActivity};
pub use client::{
    Client, ClientBalance, ClientRemoval, ClientType, CreateClient, ListClientsFilter,
    UpdateClient,
};
pub use company::{
    Company, CreateCompany, UpdateCompany, DEFAULT_COUNTRY, DEFAULT_INVOICE_PREFIX,
    DEFAULT_PAYMENT_TERMS, DEFAULT_PRIMARY_COLOR,
};
pub use invoice::{
    CreateInvoice, Invoice, InvoiceStatus, ListInvoicesFilter, StatusChange, UpdateInvoice,
};
pub use line_item::{LineItem, NewLineItem, UpdateLineItem};
pub use product::{
    CreateProduct, ListProductsFilter, Product, ProductType, UpdateProduct, DEFAULT_UNIT,
};
pub use tax_rate::TaxRate;
pub use user::{CreateUser, SanitizedUser, UpdateProfile, User};
