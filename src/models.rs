//! Screener data models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A watchlist instrument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Exchange-qualified code, e.g. `600000.SH`
    pub code: String,
    pub name: String,
    pub category: String,
}

/// Reference table entry (`stock_basic` export)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub ts_code: String,
    pub name: String,
}

/// Watchlist row whose name disagrees with the reference table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameMismatch {
    pub code: String,
    pub watchlist_name: String,
    /// `None` when the code is absent from the reference table
    pub reference_name: Option<String>,
}

/// One trading day of one instrument, as returned by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub code: String,
    pub trade_date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub pre_close: f64,
    pub change: f64,
    pub pct_chg: f64,
    /// Volume in lots
    pub vol: f64,
    /// Turnover in thousands of CNY
    pub amount: f64,
}

/// Direction of traded amount versus the previous trading day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VolumeTrend {
    Expanding,
    Contracting,
    /// First day of an instrument, or no change
    Undefined,
}

impl VolumeTrend {
    pub fn from_change(amount_change: Option<f64>) -> Self {
        match amount_change {
            Some(c) if c > 0.0 => VolumeTrend::Expanding,
            Some(c) if c < 0.0 => VolumeTrend::Contracting,
            _ => VolumeTrend::Undefined,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VolumeTrend::Expanding => "expanding",
            VolumeTrend::Contracting => "contracting",
            VolumeTrend::Undefined => "",
        }
    }
}

/// Direction of the close versus the prior close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceTrend {
    Up,
    Down,
    Flat,
}

impl PriceTrend {
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            PriceTrend::Up
        } else if change < 0.0 {
            PriceTrend::Down
        } else {
            PriceTrend::Flat
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriceTrend::Up => "up",
            PriceTrend::Down => "down",
            PriceTrend::Flat => "",
        }
    }
}

impl fmt::Display for VolumeTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for PriceTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A daily bar with its derived indicator flags, joined with watchlist data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedBar {
    pub bar: DailyBar,
    pub name: String,
    pub category: String,
    pub limit_up_price: f64,
    pub amount_change: Option<f64>,
    pub volume_trend: VolumeTrend,
    pub price_trend: PriceTrend,
    pub limit_up_today: bool,
    pub limit_up_yesterday: Option<bool>,
    pub signal: bool,
}

impl FlaggedBar {
    pub fn code(&self) -> &str {
        &self.bar.code
    }

    pub fn trade_date(&self) -> NaiveDate {
        self.bar.trade_date
    }
}

/// Trailing-window summary of one instrument
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct InstrumentScore {
    /// Number of signal days
    pub index1: u32,
    /// Largest |amount change| on days not preceded by a limit-up
    pub index2: Option<f64>,
}

/// A flagged bar paired with its instrument's score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBar {
    pub row: FlaggedBar,
    pub score: InstrumentScore,
}
