//! In-memory data source for tests

use super::{DailyRequest, MarketDataSource};
use crate::error::{AppError, Result};
use crate::models::DailyBar;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

/// Serves bars from a fixed history and records every request
pub struct StaticSource {
    history: Vec<DailyBar>,
    fail_with: Option<(i64, String)>,
    requests: Mutex<Vec<DailyRequest>>,
}

impl StaticSource {
    pub fn new(history: Vec<DailyBar>) -> Self {
        Self {
            history,
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(code: i64, message: &str) -> Self {
        Self {
            history: Vec::new(),
            fail_with: Some((code, message.to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<DailyRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl MarketDataSource for StaticSource {
    fn id(&self) -> &'static str {
        "static"
    }

    async fn daily(&self, request: &DailyRequest) -> Result<Vec<DailyBar>> {
        self.requests.lock().push(request.clone());

        if let Some((code, message)) = &self.fail_with {
            return Err(AppError::DataSource {
                code: *code,
                message: message.clone(),
            });
        }

        // Newest first, like the live API
        let mut rows: Vec<DailyBar> = self
            .history
            .iter()
            .filter(|b| request.codes.contains(&b.code))
            .filter(|b| b.trade_date >= request.start && b.trade_date <= request.end)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.trade_date.cmp(&a.trade_date));
        Ok(rows)
    }
}

/// Round to two decimal places, halves away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Bar with the fields the indicators read; the rest are derived
pub fn bar(code: &str, trade_date: NaiveDate, pre_close: f64, close: f64, amount: f64) -> DailyBar {
    let change = round2(close - pre_close);
    DailyBar {
        code: code.to_string(),
        trade_date,
        open: pre_close,
        high: close.max(pre_close),
        low: close.min(pre_close),
        close,
        pre_close,
        change,
        pct_chg: change / pre_close * 100.0,
        vol: amount / close,
        amount,
    }
}

/// Consecutive weekday trading dates starting at `start`
pub fn weekdays(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    use chrono::Datelike;

    start
        .iter_days()
        .filter(|d| d.weekday().number_from_monday() <= 5)
        .take(count)
        .collect()
}
