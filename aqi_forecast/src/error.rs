//! Error types for the aqi_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the aqi_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to observation data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Assembled features do not match the trained feature names
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// The registry holds no candidates for a model family
    #[error("No registered models found for '{0}'")]
    EmptyCandidates(String),

    /// Error raised by a model artifact or its prediction call
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Upstream request failed in a way that may succeed on retry
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// Upstream request failed permanently
    #[error("Network error: {0}")]
    Network(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from JSON serialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from numeric helpers
    #[error("Math error: {0}")]
    MathError(#[from] aqi_math::MathError),
}

impl ForecastError {
    /// Whether retrying the failed operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, ForecastError::TransientNetwork(_))
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<tempfile::PersistError> for ForecastError {
    fn from(err: tempfile::PersistError) -> Self {
        ForecastError::IoError(err.error)
    }
}
