//! In-process request log

use crate::{RecordedRequest, RecorderError, RequestRecorder};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use vapi_types::SandboxId;

/// Default per-sandbox retention
pub const DEFAULT_RETENTION: usize = 1_000;

/// Per-sandbox ring of recorded requests
///
/// Each sandbox's log sits behind its own mutex, so appends for different
/// sandboxes never contend. `retention == 0` keeps everything.
#[derive(Debug)]
pub struct MemoryRecorder {
    logs: DashMap<SandboxId, Mutex<VecDeque<RecordedRequest>>>,
    retention: usize,
}

impl MemoryRecorder {
    /// Create recorder keeping at most `retention` entries per sandbox
    #[inline]
    #[must_use]
    pub fn new(retention: usize) -> Self {
        Self {
            logs: DashMap::new(),
            retention,
        }
    }

    /// Insertion-ordered copy of a sandbox's log
    #[must_use]
    pub fn entries(&self, sandbox: SandboxId) -> Vec<RecordedRequest> {
        self.logs
            .get(&sandbox)
            .map(|log| log.lock().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of entries held for a sandbox
    #[must_use]
    pub fn len(&self, sandbox: SandboxId) -> usize {
        self.logs.get(&sandbox).map_or(0, |log| log.lock().len())
    }

    /// Configured retention
    #[inline]
    #[must_use]
    pub fn retention(&self) -> usize {
        self.retention
    }
}

impl Default for MemoryRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

#[async_trait]
impl RequestRecorder for MemoryRecorder {
    async fn record(&self, sandbox: SandboxId, entry: RecordedRequest) -> Result<(), RecorderError> {
        let log = self.logs.entry(sandbox).or_default();
        let mut guard = log.lock();
        guard.push_back(entry);
        if self.retention > 0 {
            while guard.len() > self.retention {
                guard.pop_front();
            }
        }
        Ok(())
    }

    async fn recent(&self, sandbox: SandboxId, limit: usize) -> Result<Vec<RecordedRequest>, RecorderError> {
        Ok(self
            .logs
            .get(&sandbox)
            .map(|log| log.lock().iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, sandbox: SandboxId) -> Result<(), RecorderError> {
        self.logs.remove(&sandbox);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResponseSource;
    use serde_json::json;
    use vapi_types::{EndpointKey, HttpMethod, MockRequest};

    fn entry(n: i64) -> RecordedRequest {
        RecordedRequest::now(
            EndpointKey::new(HttpMethod::Get, "/items"),
            &MockRequest::default(),
            json!({ "n": n }),
            ResponseSource::Schema,
        )
    }

    #[tokio::test]
    async fn record_preserves_insertion_order() {
        let recorder = MemoryRecorder::new(0);
        let sandbox = SandboxId::new();
        for n in 0..3 {
            recorder.record(sandbox, entry(n)).await.unwrap();
        }
        let responses: Vec<_> = recorder
            .entries(sandbox)
            .into_iter()
            .map(|e| e.response["n"].as_i64().unwrap())
            .collect();
        assert_eq!(responses, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let recorder = MemoryRecorder::new(0);
        let sandbox = SandboxId::new();
        for n in 0..5 {
            recorder.record(sandbox, entry(n)).await.unwrap();
        }
        let recent = recorder.recent(sandbox, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].response["n"], 4);
        assert_eq!(recent[1].response["n"], 3);
    }

    #[tokio::test]
    async fn retention_drops_oldest() {
        let recorder = MemoryRecorder::new(2);
        let sandbox = SandboxId::new();
        for n in 0..4 {
            recorder.record(sandbox, entry(n)).await.unwrap();
        }
        let kept: Vec<_> = recorder
            .entries(sandbox)
            .into_iter()
            .map(|e| e.response["n"].as_i64().unwrap())
            .collect();
        assert_eq!(kept, vec![2, 3]);
    }

    #[tokio::test]
    async fn logs_are_isolated_per_sandbox() {
        let recorder = MemoryRecorder::default();
        let a = SandboxId::new();
        let b = SandboxId::new();
        recorder.record(a, entry(1)).await.unwrap();
        assert_eq!(recorder.len(a), 1);
        assert_eq!(recorder.len(b), 0);

        recorder.clear(a).await.unwrap();
        assert_eq!(recorder.len(a), 0);
    }
}
