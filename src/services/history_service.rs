//! History Service
//!
//! Fetches daily bars for the whole watchlist over a trailing window.
//! Holidays and weekends mean a window of N calendar days holds fewer than
//! N trading days, so the look-back is widened until enough rows arrive.

use crate::config::format_date;
use crate::error::{AppError, Result};
use crate::market::DailyRequest;
use crate::models::DailyBar;
use crate::state::AppState;
use chrono::{Duration, NaiveDate};
use tracing::{info, warn};

/// History service for business logic
pub struct HistoryService;

impl HistoryService {
    /// Fetch at least `window_days + 1` rows per instrument ending at `as_of`
    ///
    /// Each short response widens the look-back by the number of rows
    /// received per instrument (at least one day) and retries. The loop
    /// stops at the configured attempt or look-back limit with
    /// [`AppError::InsufficientData`]. Data-source errors abort immediately.
    pub async fn fetch_window(state: &AppState, as_of: NaiveDate, window_days: u32) -> Result<Vec<DailyBar>> {
        let count = state.watchlist.len();
        let required = count * (window_days as usize + 1);
        let policy = state.config.retry;
        let codes = state.watchlist.codes();

        info!(
            "HistoryService::fetch_window - {} instruments, as_of={} window={} required_rows={}",
            count,
            format_date(as_of),
            window_days,
            required
        );

        let mut lookback = window_days;
        let mut attempts = 0;
        let mut rows;

        loop {
            attempts += 1;

            let start = as_of - Duration::days(i64::from(lookback));
            let request = DailyRequest::new(codes.clone(), start, as_of);
            let bars = state.source.daily(&request).await?;
            rows = bars.len();

            if rows >= required {
                info!("Fetched {} rows in {} attempt(s), look-back {} days", rows, attempts, lookback);
                return Ok(bars);
            }

            if attempts >= policy.max_attempts || lookback >= policy.max_lookback_days {
                break;
            }

            let widen = ((rows / count.max(1)) as u32).max(1);
            lookback = lookback.saturating_add(widen).min(policy.max_lookback_days);

            warn!(
                "Got {} of {} rows from {}, widening look-back to {} days",
                rows,
                required,
                request.start_param(),
                lookback
            );
        }

        Err(AppError::InsufficientData {
            attempts,
            rows,
            required,
        })
    }
}
