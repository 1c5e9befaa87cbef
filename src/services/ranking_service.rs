//! Ranking Service
//!
//! Reduces flagged rows over the last N trading dates into two indices per
//! instrument, then pairs every kept row with its instrument's indices.

use crate::error::{AppError, Result};
use crate::models::{FlaggedBar, InstrumentScore, RankedBar};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

/// Ranking service for business logic
pub struct RankingService;

impl RankingService {
    /// Keep the last `threshold_days` trading dates and score each instrument
    ///
    /// The window is taken over the distinct dates present in the table,
    /// so weekends and holidays do not count. The output has one row per
    /// kept input row; all rows of an instrument carry the same score.
    pub fn aggregate(flagged: Vec<FlaggedBar>, window_days: u32, threshold_days: u32) -> Result<Vec<RankedBar>> {
        if threshold_days < 1 || threshold_days > window_days {
            return Err(AppError::Config(format!(
                "threshold_days must be between 1 and window_days ({}), got {}",
                window_days, threshold_days
            )));
        }

        let kept = Self::last_trading_days(flagged, threshold_days);

        // Pass 1: score per instrument
        let scores = Self::scores(&kept);

        info!(
            "RankingService::aggregate - {} rows kept, {} instruments scored",
            kept.len(),
            scores.len()
        );

        // Pass 2: pair each row with its score
        Ok(kept
            .into_iter()
            .map(|row| {
                let score = scores.get(row.code()).copied().unwrap_or_default();
                RankedBar { row, score }
            })
            .collect())
    }

    /// Rows whose date is among the last `threshold_days` distinct dates
    pub fn last_trading_days(flagged: Vec<FlaggedBar>, threshold_days: u32) -> Vec<FlaggedBar> {
        let dates: BTreeSet<NaiveDate> = flagged.iter().map(|r| r.trade_date()).collect();
        let window: HashSet<NaiveDate> = dates
            .into_iter()
            .rev()
            .take(threshold_days as usize)
            .collect();

        flagged
            .into_iter()
            .filter(|r| window.contains(&r.trade_date()))
            .collect()
    }

    /// index1 and index2 for every instrument in the rows
    pub fn scores(rows: &[FlaggedBar]) -> HashMap<String, InstrumentScore> {
        let mut scores: HashMap<String, InstrumentScore> = HashMap::new();

        for row in rows {
            let score = scores.entry(row.code().to_string()).or_default();

            if row.signal {
                score.index1 += 1;
            }

            if row.limit_up_yesterday == Some(false) {
                if let Some(change) = row.amount_change {
                    let magnitude = change.abs();
                    score.index2 = Some(score.index2.map_or(magnitude, |m| m.max(magnitude)));
                }
            }
        }

        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyBar, PriceTrend, VolumeTrend};

    fn row(code: &str, trade_date: NaiveDate, signal: bool, amount_change: Option<f64>, limit_yesterday: Option<bool>) -> FlaggedBar {
        FlaggedBar {
            bar: DailyBar {
                code: code.to_string(),
                trade_date,
                open: 10.0,
                high: 10.0,
                low: 10.0,
                close: 10.0,
                pre_close: 10.0,
                change: 0.0,
                pct_chg: 0.0,
                vol: 100.0,
                amount: 1000.0,
            },
            name: code.to_string(),
            category: "c".to_string(),
            limit_up_price: 11.0,
            amount_change,
            volume_trend: VolumeTrend::from_change(amount_change),
            price_trend: PriceTrend::Flat,
            limit_up_today: false,
            limit_up_yesterday: limit_yesterday,
            signal,
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_window_uses_trading_dates_not_calendar_days() {
        // Thu, Fri, Mon, Tue, Wed: the last three are Mon..Wed despite the weekend
        let dates = [d(4), d(5), d(8), d(9), d(10)];
        let rows: Vec<FlaggedBar> = dates
            .iter()
            .map(|&dt| row("600000.SH", dt, false, Some(1.0), Some(false)))
            .collect();

        let kept = RankingService::last_trading_days(rows, 3);
        let kept_dates: Vec<NaiveDate> = kept.iter().map(|r| r.trade_date()).collect();
        assert_eq!(kept_dates, vec![d(8), d(9), d(10)]);
    }

    #[test]
    fn test_index1_counts_signals_in_window() {
        let rows = vec![
            row("A", d(2), true, Some(5.0), Some(false)),
            row("A", d(3), true, Some(5.0), Some(false)),
            row("A", d(4), false, Some(5.0), Some(false)),
            row("A", d(5), true, Some(5.0), Some(false)),
            row("B", d(4), true, Some(5.0), Some(false)),
            row("B", d(5), true, Some(5.0), Some(false)),
        ];

        let ranked = RankingService::aggregate(rows, 5, 3).unwrap();

        // d(2) falls outside the window
        assert_eq!(ranked.len(), 5);
        // A: 2 of 3 days, B: 2 of 2 days
        assert!(ranked.iter().all(|r| r.score.index1 == 2));
    }

    #[test]
    fn test_index2_skips_days_after_limit_up() {
        let rows = vec![
            row("A", d(3), false, Some(-40.0), Some(false)),
            row("A", d(4), false, Some(900.0), Some(true)),
            row("A", d(5), false, Some(25.0), Some(false)),
        ];

        let scores = RankingService::scores(&rows);
        assert_eq!(scores["A"].index2, Some(40.0));
    }

    #[test]
    fn test_index2_missing_when_every_day_follows_limit_up() {
        let rows = vec![
            row("A", d(3), true, Some(300.0), Some(true)),
            row("A", d(4), false, Some(-100.0), Some(true)),
            row("B", d(4), false, None, None),
        ];

        let ranked = RankingService::aggregate(rows, 5, 5).unwrap();
        assert!(ranked.iter().all(|r| r.score.index2.is_none()));
        let a: Vec<_> = ranked.iter().filter(|r| r.row.code() == "A").collect();
        assert!(a.iter().all(|r| r.score.index1 == 1));
    }

    #[test]
    fn test_broadcast_keeps_row_count() {
        let rows = vec![
            row("A", d(3), true, Some(10.0), Some(false)),
            row("B", d(3), false, Some(-30.0), Some(false)),
            row("A", d(4), false, Some(-20.0), Some(false)),
            row("B", d(4), true, Some(5.0), Some(false)),
        ];

        let ranked = RankingService::aggregate(rows.clone(), 5, 2).unwrap();
        assert_eq!(ranked.len(), rows.len());

        let a: Vec<_> = ranked.iter().filter(|r| r.row.code() == "A").collect();
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|r| r.score == InstrumentScore { index1: 1, index2: Some(20.0) }));

        let b: Vec<_> = ranked.iter().filter(|r| r.row.code() == "B").collect();
        assert!(b.iter().all(|r| r.score == InstrumentScore { index1: 1, index2: Some(30.0) }));
    }

    #[test]
    fn test_empty_input() {
        assert!(RankingService::aggregate(vec![], 5, 3).unwrap().is_empty());
    }

    #[test]
    fn test_threshold_outside_window_rejected() {
        let rows = vec![row("A", d(3), true, Some(1.0), Some(false))];
        assert!(matches!(
            RankingService::aggregate(rows.clone(), 5, 7),
            Err(AppError::Config(_))
        ));
        assert!(matches!(RankingService::aggregate(rows, 5, 0), Err(AppError::Config(_))));
    }
}
