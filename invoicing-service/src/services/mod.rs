//! Services module for invoicing-service.

pub mod accounts;
pub mod activity;
pub mod catalog;
pub mod database;
pub mod email;
pub mod entitlement;
pub mod in_memory;
pub mod invoices;
pub mod jwt;
pub mod metrics;
pub mod pdf;
pub mod reports;
pub mod store;
pub mod templates;

pub use accounts::{AccountService, AuthSession, NewAccount};
pub use activity::Actor;
pub use catalog::{CatalogService, ClientDetail};
pub use database::Database;
pub use email::{EmailMessage, EmailProvider, MockEmailProvider, SmtpEmailProvider};
pub use entitlement::{EntitlementChecker, PlanUsage};
pub use in_memory::InMemoryStore;
pub use invoices::{InvoiceDetail, InvoiceService, ItemInput, NewInvoice, PaymentInput};
pub use jwt::{AccessTokenClaims, JwtService};
pub use metrics::{get_metrics, init_metrics};
pub use reports::ReportService;
pub use store::InvoicingStore;
