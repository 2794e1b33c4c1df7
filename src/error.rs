//! Error types for the cardio-train pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CardioError>;

/// Main error type for the training pipeline
#[derive(Error, Debug)]
pub enum CardioError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Hyperparameter search failed for {model}: {source}")]
    SearchFailure {
        model: String,
        #[source]
        source: Box<CardioError>,
    },

    #[error("No viable model: the catalog is empty")]
    NoViableModel,

    #[error("Best model accuracy {score:.4} is below the quality threshold {threshold:.4}")]
    BelowQualityThreshold { score: f64, threshold: f64 },

    #[error("Failed to persist artifact at {path}: {reason}")]
    PersistFailure { path: String, reason: String },

    #[error("Tracking error: {0}")]
    TrackingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl CardioError {
    /// Wrap an error as a search failure for the named model family.
    pub fn search_failure(model: impl Into<String>, source: CardioError) -> Self {
        CardioError::SearchFailure {
            model: model.into(),
            source: Box::new(source),
        }
    }
}

impl From<polars::error::PolarsError> for CardioError {
    fn from(err: polars::error::PolarsError) -> Self {
        CardioError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for CardioError {
    fn from(err: serde_json::Error) -> Self {
        CardioError::SerializationError(err.to_string())
    }
}
