//! Spec/mock store
//!
//! [`SandboxStore`] owns sandbox records, their current OpenAPI document and
//! their custom mocks. Every write hits the repository first, then the cache.

use crate::cache::{StoreCache, DEFAULT_CAPACITY};
use crate::error::{StoreError, StoreResult};
use crate::model::{MockDefinition, NewMock, SandboxRecord, SandboxState};
use crate::openapi::ValidatedSpec;
use crate::repository::{KvMockRepository, KvSandboxRepository, MockRepository, SandboxRepository};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use vapi_simulation::{KeyValueStore, MemoryKv};
use vapi_types::{HttpMethod, SandboxId};

/// Sandbox, spec and mock storage with a read-through cache
#[derive(Debug, Clone)]
pub struct SandboxStore {
    sandboxes: Arc<dyn SandboxRepository>,
    mocks: Arc<dyn MockRepository>,
    cache: StoreCache,
}

impl SandboxStore {
    /// Create store over explicit repositories
    #[must_use]
    pub fn new(
        sandboxes: Arc<dyn SandboxRepository>,
        mocks: Arc<dyn MockRepository>,
        cache: StoreCache,
    ) -> Self {
        Self {
            sandboxes,
            mocks,
            cache,
        }
    }

    /// Create store keeping both repositories in one key-value backend
    #[must_use]
    pub fn with_kv(kv: Arc<dyn KeyValueStore>, cache_capacity: u64) -> Self {
        Self::new(
            Arc::new(KvSandboxRepository::new(Arc::clone(&kv))),
            Arc::new(KvMockRepository::new(kv)),
            StoreCache::new(cache_capacity),
        )
    }

    /// Create store over an in-process backend
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_kv(Arc::new(MemoryKv::new()), DEFAULT_CAPACITY)
    }

    /// Cache handle
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &StoreCache {
        &self.cache
    }

    /// Create a stopped sandbox, optionally with a validated document
    pub async fn create_sandbox(
        &self,
        name: &str,
        team_id: &str,
        spec: Option<ValidatedSpec>,
    ) -> StoreResult<SandboxRecord> {
        if name.trim().is_empty() {
            return Err(StoreError::validation("name is required"));
        }
        if team_id.trim().is_empty() {
            return Err(StoreError::validation("team id is required"));
        }
        let mut record = SandboxRecord::new(name, team_id);
        record.openapi_spec = spec;
        let record = self
            .cache
            .write_spec(record.id, async {
                self.sandboxes.put(&record).await?;
                let current = record.openapi_spec.clone();
                Ok::<_, StoreError>((record, current))
            })
            .await?;
        tracing::info!(sandbox = %record.id, team = %record.team_id, "sandbox created");
        Ok(record)
    }

    /// Load a sandbox record
    pub async fn get_sandbox(&self, id: SandboxId) -> StoreResult<Option<SandboxRecord>> {
        self.sandboxes.get(id).await
    }

    /// Load a sandbox record that must exist
    pub async fn require_sandbox(&self, id: SandboxId) -> StoreResult<SandboxRecord> {
        self.sandboxes
            .get(id)
            .await?
            .ok_or(StoreError::SandboxNotFound(id))
    }

    /// All sandboxes, optionally of one team, oldest first
    pub async fn list_sandboxes(&self, team_id: Option<&str>) -> StoreResult<Vec<SandboxRecord>> {
        let mut all = self.sandboxes.list().await?;
        if let Some(team_id) = team_id {
            all.retain(|record| record.team_id == team_id);
        }
        Ok(all)
    }

    /// Move a sandbox to a new lifecycle state, bumping its version
    pub async fn update_state(&self, id: SandboxId, state: SandboxState) -> StoreResult<SandboxRecord> {
        let mut record = self.require_sandbox(id).await?;
        record.state = state;
        record.bump();
        self.sandboxes.put(&record).await?;
        tracing::info!(sandbox = %id, state = %state, version = record.version, "sandbox state changed");
        Ok(record)
    }

    /// Persist `spec` as the sandbox's current document
    ///
    /// Bumps the version and repopulates the spec cache.
    pub async fn save_spec(&self, id: SandboxId, spec: ValidatedSpec) -> StoreResult<SandboxRecord> {
        let record = self
            .cache
            .write_spec(id, async {
                let mut record = self.require_sandbox(id).await?;
                record.openapi_spec = Some(spec.clone());
                record.bump();
                self.sandboxes.put(&record).await?;
                Ok::<_, StoreError>((record, Some(spec)))
            })
            .await?;
        tracing::info!(sandbox = %id, version = record.version, "spec saved");
        Ok(record)
    }

    /// Current document of a sandbox
    pub async fn get_spec(&self, id: SandboxId) -> StoreResult<Option<Arc<ValidatedSpec>>> {
        self.cache
            .try_spec_or_load(id, || async move {
                Ok::<_, StoreError>(self.sandboxes.get(id).await?.and_then(|r| r.openapi_spec))
            })
            .await
    }

    /// Create or overwrite the custom mock of `(sandbox, method, path)`
    ///
    /// An overwrite keeps the original id and creation time.
    ///
    /// # Errors
    /// - [`StoreError::Validation`] when path, method or response is missing
    /// - [`StoreError::SandboxNotFound`] when the sandbox does not exist
    pub async fn save_mock_definition(&self, id: SandboxId, mock: NewMock) -> StoreResult<MockDefinition> {
        let (method, path) = validate_mock(&mock)?;
        self.require_sandbox(id).await?;

        let key = (id, method, path.clone());
        let definition = self
            .cache
            .write_mock(key, async {
                let now = Utc::now();
                let definition = match self.mocks.get(id, method, &path).await? {
                    Some(existing) => MockDefinition {
                        response: mock.response,
                        is_randomized: mock.is_randomized,
                        delay_ms: mock.delay_ms,
                        updated_at: now,
                        ..existing
                    },
                    None => MockDefinition {
                        id: Uuid::new_v4(),
                        sandbox_id: id,
                        path: path.clone(),
                        method,
                        response: mock.response,
                        is_randomized: mock.is_randomized,
                        delay_ms: mock.delay_ms,
                        created_at: now,
                        updated_at: now,
                    },
                };
                self.mocks.put(&definition).await?;
                Ok::<_, StoreError>((definition.clone(), Some(definition)))
            })
            .await?;
        tracing::info!(sandbox = %id, method = %definition.method, path = %definition.path, "mock saved");
        Ok(definition)
    }

    /// Custom mock for `(sandbox, method, path)`; method is case-insensitive
    pub async fn get_mock_definition(
        &self,
        id: SandboxId,
        path: &str,
        method: &str,
    ) -> StoreResult<Option<Arc<MockDefinition>>> {
        let Some(method) = HttpMethod::parse(method) else {
            return Ok(None);
        };
        self.cache
            .try_mock_or_load((id, method, path.to_string()), || async move {
                self.mocks.get(id, method, path).await
            })
            .await
    }

    /// All custom mocks of a sandbox
    pub async fn list_mocks(&self, id: SandboxId) -> StoreResult<Vec<MockDefinition>> {
        self.mocks.list(id).await
    }

    /// Remove all mocks of a sandbox and drop its cache entries
    pub async fn delete_sandbox_data(&self, id: SandboxId) -> StoreResult<usize> {
        let mocks = self.mocks.list(id).await?;
        let removed = self.mocks.delete_sandbox(id).await?;
        for mock in mocks {
            self.cache
                .invalidate_mock(&(id, mock.method, mock.path))
                .await;
        }
        self.cache.invalidate_spec(id).await;
        Ok(removed)
    }

    /// Remove the sandbox record and everything it owns in this store
    pub async fn delete_sandbox(&self, id: SandboxId) -> StoreResult<()> {
        self.require_sandbox(id).await?;
        self.delete_sandbox_data(id).await?;
        self.sandboxes.delete(id).await?;
        self.cache.invalidate_spec(id).await;
        tracing::info!(sandbox = %id, "sandbox deleted");
        Ok(())
    }
}

fn validate_mock(mock: &NewMock) -> StoreResult<(HttpMethod, String)> {
    let path = mock.path.trim();
    if path.is_empty() {
        return Err(StoreError::validation("path is required"));
    }
    if !path.starts_with('/') {
        return Err(StoreError::validation(format!("path '{path}' must start with '/'")));
    }
    let raw_method = mock.method.trim();
    if raw_method.is_empty() {
        return Err(StoreError::validation("method is required"));
    }
    let method = HttpMethod::parse(raw_method)
        .ok_or_else(|| StoreError::validation(format!("unknown method '{raw_method}'")))?;
    if mock.response == Value::Null {
        return Err(StoreError::validation("response is required"));
    }
    Ok((method, path.to_string()))
}
