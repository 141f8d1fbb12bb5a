use vapi_types::SandboxId;

/// Errors writing or reading the request log
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// Backend refused the write
    #[error("failed to record request for sandbox {sandbox}: {message}")]
    WriteFailed {
        /// Sandbox whose log was targeted
        sandbox: SandboxId,
        /// Backend message
        message: String,
    },

    /// Entry could not be encoded
    #[error("failed to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RecorderError {
    /// Create write failure
    pub fn write_failed(sandbox: SandboxId, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            sandbox,
            message: message.into(),
        }
    }
}
