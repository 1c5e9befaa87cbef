//! Watchlist Screener - Daily signal ranking for A-share watchlists
//!
//! Fetches recent daily bars for a watchlist from Tushare Pro, flags each
//! trading day by volume and price direction, ranks instruments over the
//! last few trading days and writes an xlsx report grouped by category.

pub mod config;
pub mod error;
pub mod market;
pub mod models;
pub mod services;
pub mod state;

use config::ScreenerConfig;
use error::Result;
use services::{ReportService, RunParams, StrategyService};
use state::AppState;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the default filter. Calling this twice is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "watchlist_screener=debug,reqwest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Run one screening pass and write the report
///
/// Returns the path of the written workbook.
pub async fn run(config: ScreenerConfig) -> Result<PathBuf> {
    tracing::info!("Starting Watchlist Screener...");

    let params = RunParams::from_config(&config);
    params.validate()?;

    let state = AppState::new(config)?;
    let ranked = StrategyService::run(&state, &params).await?;

    ReportService::write(
        &ranked,
        &state.config.output_dir,
        state.config.report_file_name.as_deref(),
    )
}
