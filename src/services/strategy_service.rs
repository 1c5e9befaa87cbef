//! Strategy Service
//!
//! One screening run: parameter check, indicator pipeline, aggregation.

use crate::config::{AsOfDate, ScreenerConfig};
use crate::error::{AppError, Result};
use crate::models::RankedBar;
use crate::services::{IndicatorService, RankingService};
use crate::state::AppState;
use tracing::info;

/// Parameters of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    pub as_of: AsOfDate,
    /// Trading days of history per instrument
    pub window_days: u32,
    /// Trailing trading days used for index1/index2
    pub threshold_days: u32,
}

impl RunParams {
    pub fn from_config(config: &ScreenerConfig) -> Self {
        Self {
            as_of: config.as_of,
            window_days: config.window_days,
            threshold_days: config.threshold_days,
        }
    }

    /// `1 <= threshold_days <= window_days`
    pub fn validate(&self) -> Result<()> {
        if self.window_days < 1 {
            return Err(AppError::Config("window_days must be at least 1".to_string()));
        }
        if self.threshold_days < 1 {
            return Err(AppError::Config("threshold_days must be at least 1".to_string()));
        }
        if self.threshold_days > self.window_days {
            return Err(AppError::Config(format!(
                "threshold_days ({}) must not exceed window_days ({})",
                self.threshold_days, self.window_days
            )));
        }
        Ok(())
    }
}

/// Strategy service for business logic
pub struct StrategyService;

impl StrategyService {
    /// Run the full calculation and return ranked rows
    ///
    /// Parameters are checked before any data-source request.
    pub async fn run(state: &AppState, params: &RunParams) -> Result<Vec<RankedBar>> {
        params.validate()?;

        info!(
            "StrategyService::run - as_of={} window={} threshold={}",
            params.as_of, params.window_days, params.threshold_days
        );

        let flagged = IndicatorService::calculate(state, params.as_of, params.window_days).await?;
        let ranked = RankingService::aggregate(flagged, params.window_days, params.threshold_days)?;

        info!("Run produced {} ranked rows", ranked.len());
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::testing::{bar, date, weekdays, StaticSource};
    use crate::models::Instrument;
    use crate::services::Watchlist;
    use std::sync::Arc;

    fn state(source: Arc<StaticSource>) -> AppState {
        let watchlist = Watchlist::new(vec![
            Instrument {
                code: "600000.SH".to_string(),
                name: "浦发银行".to_string(),
                category: "银行".to_string(),
            },
            Instrument {
                code: "601398.SH".to_string(),
                name: "工商银行".to_string(),
                category: "银行".to_string(),
            },
        ])
        .unwrap();

        AppState::from_parts(ScreenerConfig::new("token", "w.csv"), watchlist, source).unwrap()
    }

    fn params(window_days: u32, threshold_days: u32) -> RunParams {
        RunParams {
            as_of: AsOfDate::On(date(2024, 1, 12)),
            window_days,
            threshold_days,
        }
    }

    #[test]
    fn test_params_validation() {
        assert!(params(5, 3).validate().is_ok());
        assert!(params(5, 5).validate().is_ok());
        assert!(matches!(params(5, 7).validate(), Err(AppError::Config(_))));
        assert!(matches!(params(5, 0).validate(), Err(AppError::Config(_))));
        assert!(matches!(params(0, 0).validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_params_from_config() {
        let mut config = ScreenerConfig::new("token", "w.csv");
        config.window_days = 10;
        config.threshold_days = 4;
        config.as_of = AsOfDate::On(date(2024, 3, 1));

        let p = RunParams::from_config(&config);
        assert_eq!(p.window_days, 10);
        assert_eq!(p.threshold_days, 4);
        assert_eq!(p.as_of, AsOfDate::On(date(2024, 3, 1)));
    }

    #[tokio::test]
    async fn test_threshold_above_window_fails_before_fetch() {
        let source = Arc::new(StaticSource::new(vec![]));
        let state = state(source.clone());

        let result = StrategyService::run(&state, &params(5, 7)).await;

        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn test_run_scores_last_trading_days() {
        let days = weekdays(date(2023, 12, 18), 20);
        let mut history = Vec::new();
        for (i, &d) in days.iter().enumerate() {
            // Rising price on rising amount every day: always a signal
            let amount = 1000.0 + 100.0 * i as f64;
            history.push(bar("600000.SH", d, 7.0, 7.1, amount));
            // Flat price: never a signal
            history.push(bar("601398.SH", d, 5.0, 5.0, 3000.0 - 10.0 * i as f64));
        }

        let source = Arc::new(StaticSource::new(history));
        let state = state(source);

        let ranked = StrategyService::run(&state, &params(5, 3)).await.unwrap();

        // Jan 10, 11, 12 for both instruments
        assert_eq!(ranked.len(), 6);
        let dates: std::collections::BTreeSet<_> = ranked.iter().map(|r| r.row.trade_date()).collect();
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![date(2024, 1, 10), date(2024, 1, 11), date(2024, 1, 12)]
        );

        for r in &ranked {
            match r.row.code() {
                "600000.SH" => {
                    assert_eq!(r.score.index1, 3);
                    assert_eq!(r.score.index2, Some(100.0));
                }
                _ => {
                    assert_eq!(r.score.index1, 0);
                    assert_eq!(r.score.index2, Some(10.0));
                }
            }
        }
    }
}
