//! Error types for the productivity predictor

use thiserror::Error;

/// Result type alias for predictor operations
pub type Result<T> = std::result::Result<T, PredictorError>;

/// Main error type for cleaning, training and inference
#[derive(Error, Debug)]
pub enum PredictorError {
    /// Dataset file missing, unreadable or not parseable as CSV
    #[error("Data load error: {0}")]
    DataLoadError(String),

    /// Frame manipulation failed mid-pipeline
    #[error("Data error: {0}")]
    DataError(String),

    /// A required critical column is absent
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Category codes and mapping disagree
    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    /// Only raised by the strict feature assembler; the default one substitutes values
    #[error("Cannot coerce field {field} = {value} to a number")]
    InferenceCoercionError { field: String, value: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,
}

impl From<polars::error::PolarsError> for PredictorError {
    fn from(err: polars::error::PolarsError) -> Self {
        PredictorError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PredictorError {
    fn from(err: serde_json::Error) -> Self {
        PredictorError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PredictorError {
    fn from(err: ndarray::ShapeError) -> Self {
        PredictorError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
