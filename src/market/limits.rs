//! Daily price-limit rules for A-share instruments
//!
//! The allowed daily move depends on the board an instrument trades on:
//! - Shanghai/Shenzhen main boards: 10% (5% under special treatment, `ST`)
//! - ChiNext (`300`/`301`.SZ) and STAR (`688`/`689`.SH): 20%
//! - Beijing Stock Exchange (`.BJ`): 30%

use crate::error::{AppError, Result};
use crate::models::Instrument;

/// Daily limit rule of one instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitRule {
    MainBoard,
    SpecialTreatment,
    Growth,
    Beijing,
}

impl LimitRule {
    /// Resolve the rule for an instrument from its code and display name
    pub fn resolve(instrument: &Instrument) -> Result<Self> {
        let code = instrument.code.trim();
        let (symbol, exchange) = code.split_once('.').ok_or_else(|| {
            AppError::Config(format!("No daily-limit rule for '{}': missing exchange suffix", code))
        })?;

        if symbol.len() != 6 || !symbol.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Config(format!(
                "No daily-limit rule for '{}': expected a six-digit symbol",
                code
            )));
        }

        let rule = match exchange.to_ascii_uppercase().as_str() {
            "BJ" => LimitRule::Beijing,
            "SH" if symbol.starts_with("688") || symbol.starts_with("689") => LimitRule::Growth,
            "SZ" if symbol.starts_with("300") || symbol.starts_with("301") => LimitRule::Growth,
            "SH" if symbol.starts_with('6') => Self::main_board(&instrument.name),
            "SZ" if symbol.starts_with("00") => Self::main_board(&instrument.name),
            _ => {
                return Err(AppError::Config(format!(
                    "No daily-limit rule for '{}': unknown board",
                    code
                )))
            }
        };

        Ok(rule)
    }

    fn main_board(name: &str) -> Self {
        if name.to_ascii_uppercase().contains("ST") {
            LimitRule::SpecialTreatment
        } else {
            LimitRule::MainBoard
        }
    }

    /// Allowed move in whole percent
    pub fn percent(&self) -> i64 {
        match self {
            LimitRule::MainBoard => 10,
            LimitRule::SpecialTreatment => 5,
            LimitRule::Growth => 20,
            LimitRule::Beijing => 30,
        }
    }

    /// Limit-up price for a prior close, rounded half-up to the cent
    ///
    /// Computed in integer cents so that e.g. 9.95 * 1.1 gives 10.95.
    pub fn limit_up_price(&self, pre_close: f64) -> f64 {
        let pre_cents = to_cents(pre_close);
        let limit_cents = (pre_cents * (100 + self.percent()) + 50).div_euclid(100);
        limit_cents as f64 / 100.0
    }
}

fn to_cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Whether two prices are equal at cent precision
pub fn same_cents(a: f64, b: f64) -> bool {
    to_cents(a) == to_cents(b)
}
