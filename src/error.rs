//! Unified error type hierarchy for the benchmark results browser
//!
//! Provides structured error handling with DataError, ConfigError, FilterError,
//! and AppError.

use std::io;
use thiserror::Error;

/// Results file loading and shape errors.
///
/// Any of these is fatal for a load: the browser reports it once and renders nothing.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Results file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in results: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Results data root is missing or not list-shaped: {0}")]
    InvalidRoot(String),

    #[error("IO error while reading results: {0}")]
    IoError(#[from] io::Error),
}

/// Settings file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Rejected filter-state mutations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Unknown context: {0}")]
    UnknownContext(String),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Invalid size range: {lo} > {hi}")]
    InvalidSizeRange { lo: f64, hi: f64 },

    #[error("Invalid date range: {start} > {end}")]
    InvalidDateRange { start: i64, end: i64 },

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Backend position {index} out of range (have {len})")]
    PositionOutOfRange { index: usize, len: usize },
}

/// Global error type for the browser front end.
///
/// Provides unified error categorization and user-facing messages.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Results data could not be loaded
    #[error("Failed to load results: {0}")]
    Load(String),

    /// Settings persist or deserialize error
    #[error("Settings error: {0}")]
    Settings(String),

    /// A filter option was rejected
    #[error("Filter error: {0}")]
    Filter(String),

    /// Logging could not be initialised
    #[error("Logging error: {0}")]
    Logging(String),

    /// Rendered output could not be written
    #[error("Output error: {0}")]
    Output(String),
}

impl AppError {
    /// Get a user-facing error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            AppError::Load(msg) => format!("Failed to load benchmark data: {}", msg),
            AppError::Settings(msg) => format!("Settings error: {}", msg),
            AppError::Filter(msg) => format!("Invalid filter: {}", msg),
            AppError::Logging(msg) => format!("Could not start logging: {}", msg),
            AppError::Output(msg) => format!("Could not write output: {}", msg),
        }
    }
}

impl From<DataError> for AppError {
    fn from(e: DataError) -> Self {
        AppError::Load(e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Settings(e.to_string())
    }
}

impl From<FilterError> for AppError {
    fn from(e: FilterError) -> Self {
        AppError::Filter(e.to_string())
    }
}

/// Top-level result type for operations that may fail.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
