use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::services::reports::quarter_of;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DateRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct QuarterQuery {
    pub year: Option<i32>,
    /// 1-4, defaults to the current quarter.
    pub quarter: Option<u32>,
}

impl QuarterQuery {
    pub fn resolve(&self) -> (i32, u32) {
        let today = Utc::now().date_naive();
        (
            self.year.unwrap_or_else(|| today.year()),
            self.quarter.unwrap_or_else(|| quarter_of(today)),
        )
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ActivityQuery {
    /// Defaults to 10, at most 100.
    pub limit: Option<i64>,
}

impl ActivityQuery {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}
