//! Error types for the store

use vapi_simulation::KvError;
use vapi_types::SandboxId;

/// OpenAPI document rejected by validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid OpenAPI document: {reason}")]
pub struct InvalidSpecError {
    /// Human-readable cause, surfaced to the caller verbatim
    pub reason: String,
}

impl InvalidSpecError {
    /// Create validation failure
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Document failed validation
    #[error(transparent)]
    InvalidSpec(#[from] InvalidSpecError),

    /// Sandbox does not exist
    #[error("sandbox {0} not found")]
    SandboxNotFound(SandboxId),

    /// Required input is missing or malformed
    #[error("validation failed: {0}")]
    Validation(String),

    /// Backend failure
    #[error("storage error: {0}")]
    Storage(#[from] KvError),

    /// Stored record could not be decoded or encoded
    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl StoreError {
    /// Create validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if the error is a missing resource
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SandboxNotFound(_))
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
