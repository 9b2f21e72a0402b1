//! Error types for AlignView

use thiserror::Error;

/// Result type alias using AlignView Error
pub type Result<T> = std::result::Result<T, Error>;

/// AlignView error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Column not found: {id}")]
    ColumnNotFound { id: u64 },

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("KDMA limit exceeded for {key}: at most {max} active per column")]
    LimitExceeded { key: String, max: usize },

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Recoverable errors are handled locally (fallback or rejection)
    /// without aborting the surrounding interaction.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidValue { .. } | Error::LimitExceeded { .. }
        )
    }
}
