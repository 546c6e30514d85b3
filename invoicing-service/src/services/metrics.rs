//! Prometheus metrics for invoicing-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Invoice counter by lifecycle status reached.
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_invoices_total",
        "Total number of invoices by status reached",
        &["status"] // draft, sent, paid, overdue, cancelled
    )
    .expect("Failed to register invoices_total")
});

/// Line item mutations by operation.
pub static LINE_ITEM_MUTATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_line_item_mutations_total",
        "Total number of line item mutations",
        &["operation"] // add, update, remove
    )
    .expect("Failed to register line_item_mutations_total")
});

/// Creations refused by plan limits.
pub static ENTITLEMENT_DENIALS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_entitlement_denials_total",
        "Total number of creations denied by plan limits",
        &["resource", "plan"]
    )
    .expect("Failed to register entitlement_denials_total")
});

/// Outgoing email by template and outcome.
pub static EMAILS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_emails_total",
        "Total number of emails by template and outcome",
        &["template", "outcome"]
    )
    .expect("Failed to register emails_total")
});

/// PDF render duration histogram.
pub static PDF_RENDER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoicing_pdf_render_duration_seconds",
        "Invoice PDF render duration in seconds",
        &["outcome"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register pdf_render_duration")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoicing_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Invoiced amount (sent invoices) by currency.
pub static INVOICE_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_invoice_amount_total",
        "Total amount of sent invoices by currency",
        &["currency"]
    )
    .expect("Failed to register invoice_amount_total")
});

/// Payment amount counter by currency.
pub static PAYMENT_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_payment_amount_total",
        "Total payment amount by currency",
        &["currency"]
    )
    .expect("Failed to register payment_amount_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&LINE_ITEM_MUTATIONS_TOTAL);
    Lazy::force(&ENTITLEMENT_DENIALS_TOTAL);
    Lazy::force(&EMAILS_TOTAL);
    Lazy::force(&PDF_RENDER_DURATION);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&INVOICE_AMOUNT_TOTAL);
    Lazy::force(&PAYMENT_AMOUNT_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
