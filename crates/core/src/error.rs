//! Core Error Types
//!
//! Error type shared by the core data model. Uses thiserror for
//! ergonomic error definitions.

use thiserror::Error;

/// Core-layer error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced entity (plan step, thinking step) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid state transition or malformed data
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
