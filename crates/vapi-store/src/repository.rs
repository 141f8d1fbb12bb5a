//! Persistent repositories for sandboxes and mocks
//!
//! Both repositories keep JSON records in a [`KeyValueStore`], so the same
//! backend that holds simulation state (memory or a directory) holds them.
//!
//! Key layout:
//! - `sandboxes:{id}`: sandbox record
//! - `sandbox:{id}:mock:{METHOD}:{path}`: custom mock

use crate::error::StoreResult;
use crate::model::{MockDefinition, SandboxRecord};
use async_trait::async_trait;
use std::sync::Arc;
use vapi_simulation::KeyValueStore;
use vapi_types::{HttpMethod, SandboxId};

/// Sandbox record storage
#[async_trait]
pub trait SandboxRepository: Send + Sync + std::fmt::Debug {
    /// Load a record
    async fn get(&self, id: SandboxId) -> StoreResult<Option<SandboxRecord>>;

    /// Insert or replace a record
    async fn put(&self, record: &SandboxRecord) -> StoreResult<()>;

    /// All records
    async fn list(&self) -> StoreResult<Vec<SandboxRecord>>;

    /// Remove a record; absent records are not an error
    async fn delete(&self, id: SandboxId) -> StoreResult<()>;
}

/// Custom mock storage, one definition per `(sandbox, method, path)`
#[async_trait]
pub trait MockRepository: Send + Sync + std::fmt::Debug {
    /// Load a definition
    async fn get(&self, sandbox: SandboxId, method: HttpMethod, path: &str) -> StoreResult<Option<MockDefinition>>;

    /// Insert or replace a definition
    async fn put(&self, mock: &MockDefinition) -> StoreResult<()>;

    /// All definitions of a sandbox
    async fn list(&self, sandbox: SandboxId) -> StoreResult<Vec<MockDefinition>>;

    /// Remove all definitions of a sandbox
    async fn delete_sandbox(&self, sandbox: SandboxId) -> StoreResult<usize>;
}

const SANDBOX_PREFIX: &str = "sandboxes:";

/// [`SandboxRepository`] over a key-value backend
#[derive(Debug, Clone)]
pub struct KvSandboxRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl KvSandboxRepository {
    /// Wrap a key-value backend
    #[inline]
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn key(id: SandboxId) -> String {
        format!("{SANDBOX_PREFIX}{id}")
    }
}

#[async_trait]
impl SandboxRepository for KvSandboxRepository {
    async fn get(&self, id: SandboxId) -> StoreResult<Option<SandboxRecord>> {
        match self.kv.get(&Self::key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, record: &SandboxRecord) -> StoreResult<()> {
        self.kv
            .set(&Self::key(record.id), serde_json::to_string(record)?)
            .await?;
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<SandboxRecord>> {
        let mut out = Vec::new();
        for (_, raw) in self.kv.scan_prefix(SANDBOX_PREFIX).await? {
            out.push(serde_json::from_str::<SandboxRecord>(&raw)?);
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn delete(&self, id: SandboxId) -> StoreResult<()> {
        self.kv.delete(&Self::key(id)).await?;
        Ok(())
    }
}

/// [`MockRepository`] over a key-value backend
#[derive(Debug, Clone)]
pub struct KvMockRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl KvMockRepository {
    /// Wrap a key-value backend
    #[inline]
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn prefix(sandbox: SandboxId) -> String {
        format!("sandbox:{sandbox}:mock:")
    }

    fn key(sandbox: SandboxId, method: HttpMethod, path: &str) -> String {
        format!("{}{method}:{path}", Self::prefix(sandbox))
    }
}

#[async_trait]
impl MockRepository for KvMockRepository {
    async fn get(&self, sandbox: SandboxId, method: HttpMethod, path: &str) -> StoreResult<Option<MockDefinition>> {
        match self.kv.get(&Self::key(sandbox, method, path)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, mock: &MockDefinition) -> StoreResult<()> {
        self.kv
            .set(
                &Self::key(mock.sandbox_id, mock.method, &mock.path),
                serde_json::to_string(mock)?,
            )
            .await?;
        Ok(())
    }

    async fn list(&self, sandbox: SandboxId) -> StoreResult<Vec<MockDefinition>> {
        let mut out = Vec::new();
        for (_, raw) in self.kv.scan_prefix(&Self::prefix(sandbox)).await? {
            out.push(serde_json::from_str::<MockDefinition>(&raw)?);
        }
        Ok(out)
    }

    async fn delete_sandbox(&self, sandbox: SandboxId) -> StoreResult<usize> {
        Ok(self.kv.delete_prefix(&Self::prefix(sandbox)).await?)
    }
}
