pub mod activity;
pub mod auth;
pub mod billing;
pub mod clients;
pub mod company;
pub mod dashboard;
pub mod health;
pub mod invoices;
pub mod me;
pub mod products;
pub mod reports;

use axum::http::{header, HeaderMap};
use service_core::middleware::tracing::client_ip_from_headers;

/// Client address for audit entries, taken from `x-forwarded-for`.
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    client_ip_from_headers(headers)
}

/// Headers for a file download.
pub(crate) fn attachment(content_type: &'static str, filename: &str) -> [(header::HeaderName, String); 2] {
    [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ]
}
