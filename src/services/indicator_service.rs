//! Indicator Service
//!
//! Turns raw daily bars into flagged rows: limit-up price, day-over-day
//! amount change, volume and price trends, limit-up hits and the signal
//! flag. All day-over-day values are computed per instrument in trading
//! date order.

use crate::config::{format_date, AsOfDate};
use crate::error::Result;
use crate::market::limits::{same_cents, LimitRule};
use crate::models::{DailyBar, FlaggedBar, Instrument, PriceTrend, VolumeTrend};
use crate::services::{HistoryService, Watchlist};
use crate::state::AppState;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Whether a day is a signal day
///
/// - amount expanding while price rises
/// - amount contracting while price falls
/// - amount contracting while price rises into the limit
pub fn signal_flag(volume: VolumeTrend, price: PriceTrend, limit_up_today: bool) -> bool {
    match (volume, price) {
        (VolumeTrend::Expanding, PriceTrend::Up) => true,
        (VolumeTrend::Contracting, PriceTrend::Down) => true,
        (VolumeTrend::Contracting, PriceTrend::Up) => limit_up_today,
        _ => false,
    }
}

/// Previous trading day of one instrument
struct PreviousDay {
    amount: f64,
    limit_up: bool,
}

/// Indicator service for business logic
pub struct IndicatorService;

impl IndicatorService {
    /// Fetch the trailing window ending at `as_of` and flag every row
    pub async fn calculate(state: &AppState, as_of: AsOfDate, window_days: u32) -> Result<Vec<FlaggedBar>> {
        let as_of = as_of.resolve();
        info!(
            "IndicatorService::calculate - as_of={} window={}",
            format_date(as_of),
            window_days
        );

        let bars = HistoryService::fetch_window(state, as_of, window_days).await?;
        let flagged = Self::flag(bars, &state.watchlist, &state.limit_rules);

        info!("Flagged {} rows", flagged.len());
        Ok(flagged)
    }

    /// Flag bars, joined with watchlist name and category
    ///
    /// Rows are returned in trading date order (code order within a date).
    /// Bars for codes outside the watchlist, or without a limit rule, are
    /// dropped; a repeated (code, date) keeps its first row.
    pub fn flag(
        mut bars: Vec<DailyBar>,
        watchlist: &Watchlist,
        limit_rules: &HashMap<String, LimitRule>,
    ) -> Vec<FlaggedBar> {
        bars.sort_by(|a, b| a.trade_date.cmp(&b.trade_date).then_with(|| a.code.cmp(&b.code)));

        let instruments: HashMap<&str, &Instrument> = watchlist
            .instruments()
            .iter()
            .map(|i| (i.code.as_str(), i))
            .collect();

        let mut previous: HashMap<String, PreviousDay> = HashMap::new();
        let mut seen = HashSet::new();
        let mut flagged = Vec::with_capacity(bars.len());

        for bar in bars {
            let Some(instrument) = instruments.get(bar.code.as_str()).copied() else {
                warn!("Dropping {} on {}: not in watchlist", bar.code, format_date(bar.trade_date));
                continue;
            };
            let Some(rule) = limit_rules.get(&bar.code) else {
                warn!("Dropping {} on {}: no daily-limit rule", bar.code, format_date(bar.trade_date));
                continue;
            };

            if !seen.insert((bar.code.clone(), bar.trade_date)) {
                warn!("Dropping duplicate row for {} on {}", bar.code, format_date(bar.trade_date));
                continue;
            }

            let prev = previous.get(&bar.code);
            let amount_change = prev.map(|p| bar.amount - p.amount);
            let limit_up_yesterday = prev.map(|p| p.limit_up);

            let limit_up_price = rule.limit_up_price(bar.pre_close);
            let limit_up_today = same_cents(bar.close, limit_up_price);
            let volume_trend = VolumeTrend::from_change(amount_change);
            let price_trend = PriceTrend::from_change(bar.change);
            let signal = signal_flag(volume_trend, price_trend, limit_up_today);

            previous.insert(
                bar.code.clone(),
                PreviousDay {
                    amount: bar.amount,
                    limit_up: limit_up_today,
                },
            );

            flagged.push(FlaggedBar {
                name: instrument.name.clone(),
                category: instrument.category.clone(),
                bar,
                limit_up_price,
                amount_change,
                volume_trend,
                price_trend,
                limit_up_today,
                limit_up_yesterday,
                signal,
            });
        }

        flagged
    }
}
