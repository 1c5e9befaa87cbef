//! Application error types

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Data source error (code {code}): {message}")]
    DataSource { code: i64, message: String },

    #[error("Insufficient data after {attempts} attempts: got {rows} rows, need {required}")]
    InsufficientData {
        attempts: u32,
        rows: usize,
        required: usize,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet read error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Report write error: {0}")]
    Report(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable error code for logs and exit reporting
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Http(_) => "HTTP_ERROR",
            AppError::DataSource { .. } => "DATA_SOURCE_ERROR",
            AppError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Csv(_) => "CSV_ERROR",
            AppError::Spreadsheet(_) => "SPREADSHEET_ERROR",
            AppError::Report(_) => "REPORT_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the error came from fetching market data
    pub fn is_data_source(&self) -> bool {
        matches!(
            self,
            AppError::Http(_) | AppError::DataSource { .. } | AppError::InsufficientData { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
