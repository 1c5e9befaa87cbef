//! Screener configuration
//!
//! All settings are carried in an explicit [`ScreenerConfig`] value. The
//! binary builds it from the environment (and an optional `.env` file);
//! library callers can construct it directly.

use crate::error::{AppError, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Shanghai;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Wire date format used by the data source and report file names
pub const DATE_FORMAT: &str = "%Y%m%d";

const DEFAULT_API_URL: &str = "https://api.tushare.pro";
const DEFAULT_REFERENCE_PATH: &str = "stock_basic.csv";

/// Current date on the exchange calendar (Asia/Shanghai)
pub fn exchange_today() -> NaiveDate {
    Utc::now().with_timezone(&Shanghai).date_naive()
}

/// Format a date as YYYYMMDD
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a YYYYMMDD date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| AppError::Config(format!("Invalid date '{}' (expected YYYYMMDD): {}", value, e)))
}

/// The date a calculation is run "as of"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsOfDate {
    /// Resolved to the exchange's current date when the run starts
    #[default]
    Today,
    On(NaiveDate),
}

impl AsOfDate {
    pub fn resolve(&self) -> NaiveDate {
        match self {
            AsOfDate::Today => exchange_today(),
            AsOfDate::On(date) => *date,
        }
    }
}

impl FromStr for AsOfDate {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("today") {
            Ok(AsOfDate::Today)
        } else {
            parse_date(s).map(AsOfDate::On)
        }
    }
}

impl fmt::Display for AsOfDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsOfDate::Today => write!(f, "today"),
            AsOfDate::On(date) => write!(f, "{}", format_date(*date)),
        }
    }
}

/// Bounds for the retry-and-widen fetch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of requests per calculation (including the first)
    pub max_attempts: u32,
    /// Largest look-back, in calendar days, the window may widen to
    pub max_lookback_days: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            max_lookback_days: 366,
        }
    }
}

/// Complete screener configuration
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// Tushare Pro API token
    pub token: String,
    pub api_url: String,
    pub watchlist_path: PathBuf,
    pub reference_path: PathBuf,
    pub output_dir: PathBuf,
    pub as_of: AsOfDate,
    pub window_days: u32,
    pub threshold_days: u32,
    /// Report file stem; defaults to the exchange date
    pub report_file_name: Option<String>,
    pub retry: RetryPolicy,
    pub requests_per_minute: u32,
    pub request_timeout: Duration,
}

impl ScreenerConfig {
    /// Create a configuration with defaults for everything but the token and watchlist
    pub fn new(token: impl Into<String>, watchlist_path: impl Into<PathBuf>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            watchlist_path: watchlist_path.into(),
            reference_path: PathBuf::from(DEFAULT_REFERENCE_PATH),
            output_dir: PathBuf::from("."),
            as_of: AsOfDate::Today,
            window_days: 5,
            threshold_days: 3,
            report_file_name: None,
            retry: RetryPolicy::default(),
            requests_per_minute: 200,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = get("TUSHARE_TOKEN")
            .ok_or_else(|| AppError::Config("TUSHARE_TOKEN is not set".to_string()))?;
        let watchlist = get("SCREENER_WATCHLIST")
            .ok_or_else(|| AppError::Config("SCREENER_WATCHLIST is not set".to_string()))?;

        let mut config = Self::new(token, watchlist);

        if let Some(url) = get("TUSHARE_API_URL") {
            config.api_url = url;
        }
        if let Some(path) = get("SCREENER_REFERENCE") {
            config.reference_path = PathBuf::from(path);
        }
        if let Some(dir) = get("SCREENER_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(as_of) = get("SCREENER_AS_OF") {
            config.as_of = as_of.parse()?;
        }
        if let Some(v) = get("SCREENER_WINDOW_DAYS") {
            config.window_days = parse_number("SCREENER_WINDOW_DAYS", &v)?;
        }
        if let Some(v) = get("SCREENER_THRESHOLD_DAYS") {
            config.threshold_days = parse_number("SCREENER_THRESHOLD_DAYS", &v)?;
        }
        config.report_file_name = get("SCREENER_REPORT_NAME");
        if let Some(v) = get("SCREENER_MAX_ATTEMPTS") {
            config.retry.max_attempts = parse_number("SCREENER_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = get("SCREENER_MAX_LOOKBACK_DAYS") {
            config.retry.max_lookback_days = parse_number("SCREENER_MAX_LOOKBACK_DAYS", &v)?;
        }
        if let Some(v) = get("TUSHARE_REQUESTS_PER_MINUTE") {
            config.requests_per_minute = parse_number("TUSHARE_REQUESTS_PER_MINUTE", &v)?;
        }
        if let Some(v) = get("TUSHARE_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_number::<u64>("TUSHARE_TIMEOUT_SECS", &v)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check settings that do not depend on any file or network access
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("API token must not be empty".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.requests_per_minute == 0 {
            return Err(AppError::Config("requests_per_minute must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}
