//! Error types for faultline.

use thiserror::Error;

/// Unified error type for all faultline operations.
#[derive(Error, Debug)]
pub enum FaultlineError {
    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid input passed to a computation (e.g. mismatched matrix dimensions)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A data-structure invariant was violated (e.g. membership out of range)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// I/O errors (statement files, result output)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic errors (fallback)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FaultlineError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        FaultlineError::ConfigError(message.into())
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        FaultlineError::InvalidInput(message.into())
    }

    /// Creates an invariant-violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        FaultlineError::InvariantViolation(message.into())
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        FaultlineError::Internal(message.into())
    }

    /// Errors that abort a single time slice but not the whole series.
    pub fn is_slice_local(&self) -> bool {
        matches!(
            self,
            FaultlineError::InvalidInput(_) | FaultlineError::InvariantViolation(_)
        )
    }
}

/// Result type alias for faultline operations.
pub type Result<T> = std::result::Result<T, FaultlineError>;
