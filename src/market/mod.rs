//! Market data sources

pub mod limits;
pub mod rate_limiter;
pub mod tushare;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::format_date;
use crate::error::Result;
use crate::models::DailyBar;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Daily bar request for a set of instruments over an inclusive date range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyRequest {
    pub codes: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DailyRequest {
    pub fn new(codes: Vec<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self { codes, start, end }
    }

    /// Comma-joined instrument codes
    pub fn codes_param(&self) -> String {
        self.codes.join(",")
    }

    pub fn start_param(&self) -> String {
        format_date(self.start)
    }

    pub fn end_param(&self) -> String {
        format_date(self.end)
    }
}

/// Trait that all market data sources must implement
///
/// A source may return fewer rows than requested; callers widen the
/// window and ask again.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Source ID (e.g., "tushare")
    fn id(&self) -> &'static str;

    /// Fetch daily bars, zero or more rows per instrument per date
    async fn daily(&self, request: &DailyRequest) -> Result<Vec<DailyBar>>;
}
