//! Error types for the cardio-boost pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CardioError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum CardioError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Schema error in column '{column}': {reason}")]
    SchemaError { column: String, reason: String },

    #[error("Column '{column}' is not numeric after missing-value resolution")]
    TypeCoercion { column: String },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
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

impl From<ndarray::ShapeError> for CardioError {
    fn from(err: ndarray::ShapeError) -> Self {
        CardioError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
