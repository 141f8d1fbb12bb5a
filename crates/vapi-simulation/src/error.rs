//! Error types for the simulation engine

use crate::kv::KvError;
use vapi_types::{EndpointKey, SandboxId};

/// Simulation engine errors
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Definition is missing required fields or names an unknown plugin
    #[error("invalid simulation definition: {0}")]
    Validation(String),

    /// No simulation bound to the key
    #[error("no simulation for {endpoint} in sandbox {sandbox}")]
    NotFound {
        /// Sandbox searched
        sandbox: SandboxId,
        /// Endpoint searched
        endpoint: EndpointKey,
    },

    /// Plugin rejected the request or its configuration
    #[error("plugin '{plugin}' failed: {message}")]
    Plugin {
        /// Plugin name
        plugin: &'static str,
        /// Failure description
        message: String,
    },

    /// State backend failure
    #[error("simulation state error: {0}")]
    State(#[from] KvError),

    /// Stored state could not be decoded or encoded
    #[error("simulation state encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl SimulationError {
    /// Create plugin failure
    pub fn plugin(plugin: &'static str, message: impl Into<String>) -> Self {
        Self::Plugin {
            plugin,
            message: message.into(),
        }
    }

    /// Check if the caller supplied bad input
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound { .. })
    }
}

/// Result alias for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;
