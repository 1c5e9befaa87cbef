//! Application state management

use crate::config::ScreenerConfig;
use crate::error::Result;
use crate::market::limits::LimitRule;
use crate::market::tushare::TushareClient;
use crate::market::MarketDataSource;
use crate::services::{Watchlist, WatchlistService};
use std::collections::HashMap;
use std::sync::Arc;

/// State shared by every service of a run
pub struct AppState {
    pub config: ScreenerConfig,

    /// Validated watchlist
    pub watchlist: Watchlist,

    /// Daily-limit rule per instrument code
    pub limit_rules: HashMap<String, LimitRule>,

    /// Market data source
    pub source: Arc<dyn MarketDataSource>,
}

impl AppState {
    /// Create state backed by the Tushare Pro API
    pub fn new(config: ScreenerConfig) -> Result<Self> {
        let source = Arc::new(TushareClient::new(&config)?);
        Self::with_source(config, source)
    }

    /// Create state with an explicit data source
    ///
    /// Loads and validates the watchlist and resolves every instrument's
    /// daily-limit rule. No network call is made.
    pub fn with_source(config: ScreenerConfig, source: Arc<dyn MarketDataSource>) -> Result<Self> {
        config.validate()?;
        let watchlist = WatchlistService::load(&config.watchlist_path, &config.reference_path)?;
        Self::from_parts(config, watchlist, source)
    }

    /// Assemble state from an already loaded watchlist
    pub fn from_parts(
        config: ScreenerConfig,
        watchlist: Watchlist,
        source: Arc<dyn MarketDataSource>,
    ) -> Result<Self> {
        let limit_rules = watchlist
            .instruments()
            .iter()
            .map(|i| LimitRule::resolve(i).map(|rule| (i.code.clone(), rule)))
            .collect::<Result<HashMap<_, _>>>()?;

        tracing::info!(
            "State ready: {} instruments, data source '{}'",
            watchlist.len(),
            source.id()
        );

        Ok(Self {
            config,
            watchlist,
            limit_rules,
            source,
        })
    }
}
