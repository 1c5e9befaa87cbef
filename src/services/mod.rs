//! Services Layer
//!
//! Business logic of a screening run. Services are stateless; they take the
//! shared [`AppState`](crate::state::AppState) or plain tables and return new
//! tables.
//!
//! # Architecture
//!
//! ```text
//! Watchlist ──> AppState ──> HistoryService ──> IndicatorService
//!                                 │                   │
//!                          MarketDataSource           v
//!                                              RankingService ──> ReportService
//! ```
//!
//! # Services
//!
//! - `WatchlistService` - Load and validate the watchlist
//! - `HistoryService` - Fetch daily bars with a widening window
//! - `IndicatorService` - Per-day indicator and signal flags
//! - `RankingService` - Trailing-window index1/index2
//! - `StrategyService` - Full calculation for one run
//! - `ReportService` - Spreadsheet report

pub mod watchlist_service;
pub mod history_service;
pub mod indicator_service;
pub mod ranking_service;
pub mod strategy_service;
pub mod report_service;

// Re-export commonly used types and services
pub use watchlist_service::{Watchlist, WatchlistService};
pub use history_service::HistoryService;
pub use indicator_service::{signal_flag, IndicatorService};
pub use ranking_service::RankingService;
pub use strategy_service::{RunParams, StrategyService};
pub use report_service::{sanitize_sheet_name, ReportService};
