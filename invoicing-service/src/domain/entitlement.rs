//! Subscription plans and their usage limits.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Limit value meaning "no limit".
pub const UNLIMITED: i64 = -1;

/// Subscription plan of a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl Default for SubscriptionPlan {
    fn default() -> Self {
        Self::Free
    }
}

/// Limits and price of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlanLimits {
    pub invoices_per_month: i64,
    pub clients: i64,
    pub products: i64,
    pub reports: bool,
    /// Monthly price in euro cents.
    pub price_cents: i64,
}

impl SubscriptionPlan {
    pub const ALL: [SubscriptionPlan; 4] = [
        SubscriptionPlan::Free,
        SubscriptionPlan::Basic,
        SubscriptionPlan::Pro,
        SubscriptionPlan::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|plan| plan.as_str() == s)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Free => "Nemokamas",
            Self::Basic => "Bazinis",
            Self::Pro => "Profesionalus",
            Self::Enterprise => "Verslo",
        }
    }

    pub fn limits(&self) -> PlanLimits {
        match self {
            Self::Free => PlanLimits {
                invoices_per_month: 5,
                clients: 10,
                products: 20,
                reports: false,
                price_cents: 0,
            },
            Self::Basic => PlanLimits {
                invoices_per_month: 50,
                clients: 100,
                products: 200,
                reports: false,
                price_cents: 1900,
            },
            Self::Pro => PlanLimits {
                invoices_per_month: UNLIMITED,
                clients: UNLIMITED,
                products: UNLIMITED,
                reports: true,
                price_cents: 3900,
            },
            Self::Enterprise => PlanLimits {
                invoices_per_month: UNLIMITED,
                clients: UNLIMITED,
                products: UNLIMITED,
                reports: true,
                price_cents: 9900,
            },
        }
    }

    pub fn limit_for(&self, kind: ResourceKind) -> i64 {
        let limits = self.limits();
        match kind {
            ResourceKind::Invoice => limits.invoices_per_month,
            ResourceKind::Client => limits.clients,
            ResourceKind::Product => limits.products,
        }
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource whose creation is limited by plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Counted per calendar month.
    Invoice,
    /// Counted as active rows.
    Client,
    /// Counted as active rows.
    Product,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Invoice => "invoice",
            ResourceKind::Client => "client",
            ResourceKind::Product => "product",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Invoice => "invoices this month",
            ResourceKind::Client => "clients",
            ResourceKind::Product => "products",
        })
    }
}

/// True when one more resource may be created given current `usage`.
pub fn is_within_limit(limit: i64, usage: i64) -> bool {
    limit == UNLIMITED || usage < limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_plan_allows_five_invoices() {
        let limit = SubscriptionPlan::Free.limit_for(ResourceKind::Invoice);
        assert_eq!(limit, 5);
        assert!(is_within_limit(limit, 4));
        assert!(!is_within_limit(limit, 5));
        assert!(!is_within_limit(limit, 6));
    }

    #[test]
    fn unlimited_is_never_denied() {
        for usage in [0, 5, 1_000_000, i64::MAX] {
            assert!(is_within_limit(UNLIMITED, usage));
        }
        assert_eq!(SubscriptionPlan::Pro.limit_for(ResourceKind::Client), UNLIMITED);
    }

    #[test]
    fn zero_limit_denies_everything() {
        assert!(!is_within_limit(0, 0));
    }

    #[test]
    fn reports_only_on_paid_tiers() {
        assert!(!SubscriptionPlan::Free.limits().reports);
        assert!(!SubscriptionPlan::Basic.limits().reports);
        assert!(SubscriptionPlan::Pro.limits().reports);
        assert!(SubscriptionPlan::Enterprise.limits().reports);
    }

    #[test]
    fn plan_names_parse() {
        for plan in SubscriptionPlan::ALL {
            assert_eq!(SubscriptionPlan::parse(plan.as_str()), Some(plan));
        }
        assert_eq!(SubscriptionPlan::parse("gold"), None);
    }
}
