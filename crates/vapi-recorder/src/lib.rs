//! VAPI Request Recorder
//!
//! Append-only, per-sandbox log of every request a live mock route resolved.
//! Recording is best-effort: callers log and drop [`RecorderError`] instead of
//! failing the request it describes.
//!
//! ```text
//! handler → pipeline → response ─┬─→ client
//!                                └─→ RequestRecorder::record (errors swallowed)
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod entry;
pub mod error;
pub mod memory;

pub use entry::{RecordedRequest, RequestSnapshot, ResponseSource};
pub use error::RecorderError;
pub use memory::MemoryRecorder;

use async_trait::async_trait;
use vapi_types::SandboxId;

/// Sink for resolved requests
#[async_trait]
pub trait RequestRecorder: Send + Sync + std::fmt::Debug {
    /// Append one entry to the sandbox's log
    async fn record(&self, sandbox: SandboxId, entry: RecordedRequest) -> Result<(), RecorderError>;

    /// Newest-first view of at most `limit` entries
    async fn recent(&self, sandbox: SandboxId, limit: usize) -> Result<Vec<RecordedRequest>, RecorderError>;

    /// Drop the sandbox's log entirely
    async fn clear(&self, sandbox: SandboxId) -> Result<(), RecorderError>;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
