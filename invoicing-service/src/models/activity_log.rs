//! Audit trail of user actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Recorded user action.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ActivityLog {
    pub activity_id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "created")]
    pub action: String,
    #[schema(example = "invoice")]
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording an action.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

impl NewActivity {
    pub fn new(user_id: Uuid, action: &str) -> Self {
        Self {
            user_id,
            action: action.to_string(),
            entity_type: None,
            entity_id: None,
            details: None,
            ip_address: None,
        }
    }

    pub fn entity(mut self, entity_type: &str, entity_id: Uuid) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }
}
