//! Error types for VAPI Core
//!
//! Aggregates store and simulation failures into one [`VapiError`] whose
//! [`code`](VapiError::code) the HTTP layer renders:
//! - `invalid_spec`: document rejected, reason surfaced verbatim
//! - `not_found`: sandbox, simulation or route missing
//! - `validation_error`: required input missing or malformed
//! - `internal`: storage, state, recorder and encoding failures

use vapi_recorder::RecorderError;
use vapi_simulation::SimulationError;
use vapi_store::{InvalidSpecError, StoreError};
use vapi_types::HttpMethod;

/// Main VAPI error type
#[derive(Debug, thiserror::Error)]
pub enum VapiError {
    /// Document failed validation
    #[error(transparent)]
    InvalidSpec(#[from] InvalidSpecError),

    /// Resource does not exist or belongs to another team
    #[error("{0} not found")]
    NotFound(String),

    /// Required input is missing or malformed
    #[error("validation failed: {0}")]
    Validation(String),

    /// Store backend failure
    #[error("store error: {0}")]
    Store(StoreError),

    /// Simulation backend or plugin failure
    #[error("simulation error: {0}")]
    Simulation(SimulationError),

    /// Request log could not be read
    #[error(transparent)]
    Recorder(#[from] RecorderError),
}

impl VapiError {
    /// Create not-found error for a described resource
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable code
    #[inline]
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSpec(_) => "invalid_spec",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::Store(_) | Self::Simulation(_) | Self::Recorder(_) => "internal",
        }
    }

    /// Check if the caller supplied bad input
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Simulation(_) | Self::Recorder(_))
    }
}

impl From<StoreError> for VapiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidSpec(e) => Self::InvalidSpec(e),
            StoreError::SandboxNotFound(id) => Self::NotFound(format!("sandbox {id}")),
            StoreError::Validation(message) => Self::Validation(message),
            other => Self::Store(other),
        }
    }
}

impl From<SimulationError> for VapiError {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::Validation(message) => Self::Validation(message),
            SimulationError::NotFound { endpoint, .. } => {
                Self::NotFound(format!("simulation for {endpoint}"))
            }
            other => Self::Simulation(other),
        }
    }
}

/// Two operations of one document derive the same route
///
/// Never surfaced to callers; the later operation replaces the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate route {method} {template}: '{replaced}' replaced by '{kept}'")]
pub struct ConflictError {
    /// Method of both operations
    pub method: HttpMethod,
    /// Normalized template both declared paths reduce to
    pub template: String,
    /// Declared path dropped
    pub replaced: String,
    /// Declared path kept
    pub kept: String,
}

/// Result type for core operations
pub type VapiResult<T> = Result<T, VapiError>;
