//! Simulation definitions and their repository

use crate::error::SimulationResult;
use crate::kv::KeyValueStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;
use vapi_types::{EndpointKey, SandboxId};

/// Plugin binding or literal scenario, plus free-form plugin options
///
/// ```json
/// { "plugin": "balance", "initial": 500 }
/// { "scenario": { "status": "declined" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Registered plugin name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    /// Literal response returned when no plugin runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Value>,
    /// Plugin-specific options (`initial`, `threshold`, `delayMs`, ...)
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl SimulationConfig {
    /// Config bound to a plugin
    #[must_use]
    pub fn plugin(name: impl Into<String>) -> Self {
        Self {
            plugin: Some(name.into()),
            ..Self::default()
        }
    }

    /// Config returning a fixed scenario
    #[must_use]
    pub fn scenario(payload: Value) -> Self {
        Self {
            scenario: Some(payload),
            ..Self::default()
        }
    }

    /// With plugin option
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Numeric option
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.options.get(key).and_then(Value::as_f64)
    }
}

/// Simulation bound to one `(sandbox, endpoint)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationDefinition {
    /// Definition id
    pub id: Uuid,
    /// Owning sandbox
    pub sandbox_id: SandboxId,
    /// Bound endpoint
    pub endpoint: EndpointKey,
    /// Plugin binding or scenario
    pub config: SimulationConfig,
    /// Only enabled definitions run
    pub enabled: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl SimulationDefinition {
    /// New enabled definition
    #[must_use]
    pub fn new(sandbox_id: SandboxId, endpoint: EndpointKey, config: SimulationConfig) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sandbox_id,
            endpoint,
            config,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Persistent storage for simulation definitions
#[async_trait]
pub trait SimulationRepository: Send + Sync + std::fmt::Debug {
    /// Definition for a key, enabled or not
    async fn get(&self, sandbox: SandboxId, endpoint: &EndpointKey) -> SimulationResult<Option<SimulationDefinition>>;

    /// Insert or replace by `(sandbox, endpoint)`
    async fn upsert(&self, definition: SimulationDefinition) -> SimulationResult<()>;

    /// All definitions of a sandbox
    async fn list(&self, sandbox: SandboxId) -> SimulationResult<Vec<SimulationDefinition>>;

    /// Drop all definitions of a sandbox
    async fn delete_sandbox(&self, sandbox: SandboxId) -> SimulationResult<usize>;
}

/// In-process repository
#[derive(Debug, Default)]
pub struct MemorySimulationRepository {
    inner: DashMap<(SandboxId, EndpointKey), SimulationDefinition>,
}

impl MemorySimulationRepository {
    /// Create empty repository
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SimulationRepository for MemorySimulationRepository {
    async fn get(&self, sandbox: SandboxId, endpoint: &EndpointKey) -> SimulationResult<Option<SimulationDefinition>> {
        Ok(self
            .inner
            .get(&(sandbox, endpoint.clone()))
            .map(|d| d.value().clone()))
    }

    async fn upsert(&self, definition: SimulationDefinition) -> SimulationResult<()> {
        self.inner
            .insert((definition.sandbox_id, definition.endpoint.clone()), definition);
        Ok(())
    }

    async fn list(&self, sandbox: SandboxId) -> SimulationResult<Vec<SimulationDefinition>> {
        let mut out: Vec<_> = self
            .inner
            .iter()
            .filter(|e| e.key().0 == sandbox)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        Ok(out)
    }

    async fn delete_sandbox(&self, sandbox: SandboxId) -> SimulationResult<usize> {
        let before = self.inner.len();
        self.inner.retain(|(id, _), _| *id != sandbox);
        Ok(before.saturating_sub(self.inner.len()))
    }
}

/// Repository persisting definitions in a [`KeyValueStore`]
///
/// Keys: `sandbox:{id}:simulation:{METHOD path}`.
#[derive(Debug, Clone)]
pub struct KvSimulationRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl KvSimulationRepository {
    /// Wrap a key-value backend
    #[inline]
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn prefix(sandbox: SandboxId) -> String {
        format!("sandbox:{sandbox}:simulation:")
    }

    fn key(sandbox: SandboxId, endpoint: &EndpointKey) -> String {
        format!("{}{endpoint}", Self::prefix(sandbox))
    }
}

#[async_trait]
impl SimulationRepository for KvSimulationRepository {
    async fn get(&self, sandbox: SandboxId, endpoint: &EndpointKey) -> SimulationResult<Option<SimulationDefinition>> {
        match self.kv.get(&Self::key(sandbox, endpoint)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, definition: SimulationDefinition) -> SimulationResult<()> {
        let raw = serde_json::to_string(&definition)?;
        self.kv
            .set(&Self::key(definition.sandbox_id, &definition.endpoint), raw)
            .await?;
        Ok(())
    }

    async fn list(&self, sandbox: SandboxId) -> SimulationResult<Vec<SimulationDefinition>> {
        let mut out = Vec::new();
        for (_, raw) in self.kv.scan_prefix(&Self::prefix(sandbox)).await? {
            out.push(serde_json::from_str::<SimulationDefinition>(&raw)?);
        }
        out.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        Ok(out)
    }

    async fn delete_sandbox(&self, sandbox: SandboxId) -> SimulationResult<usize> {
        Ok(self.kv.delete_prefix(&Self::prefix(sandbox)).await?)
    }
}
