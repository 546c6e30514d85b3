//! Request actor and best-effort audit recording.

use tracing::warn;
use uuid::Uuid;

use crate::models::{Company, NewActivity};
use crate::services::metrics::ERRORS_TOTAL;
use crate::services::store::InvoicingStore;

/// The authenticated user acting on their company.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub company: Company,
    pub ip: Option<String>,
}

impl Actor {
    pub fn company_id(&self) -> Uuid {
        self.company.company_id
    }

    /// Activity entry for `action` by this actor.
    pub fn activity(&self, action: &str) -> NewActivity {
        NewActivity::new(self.user_id, action).ip(self.ip.clone())
    }
}

/// Record an audit entry. A failed write is logged, never returned.
pub async fn record(store: &dyn InvoicingStore, activity: NewActivity) {
    if let Err(e) = store.record_activity(&activity).await {
        ERRORS_TOTAL.with_label_values(&["activity_write"]).inc();
        warn!(action = %activity.action, error = %e, "Failed to record activity");
    }
}
