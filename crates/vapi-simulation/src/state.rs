//! Per-endpoint simulation state
//!
//! State for one `(sandbox, endpoint)` pair is a single JSON object mapping
//! user id → plugin-owned blob. It is always loaded and stored as one unit.

use crate::error::SimulationResult;
use crate::kv::KeyValueStore;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use vapi_types::{EndpointKey, SandboxId};

/// user id → plugin state
pub type StateMap = Map<String, Value>;

/// Typed access to simulation state
#[async_trait]
pub trait SimulationStateStore: Send + Sync + std::fmt::Debug {
    /// Load the full state map; empty when nothing was stored yet
    async fn get(&self, sandbox: SandboxId, endpoint: &EndpointKey) -> SimulationResult<StateMap>;

    /// Replace the full state map
    async fn put(&self, sandbox: SandboxId, endpoint: &EndpointKey, state: &StateMap) -> SimulationResult<()>;

    /// Forget all state of one sandbox
    async fn clear_sandbox(&self, sandbox: SandboxId) -> SimulationResult<usize>;
}

/// State store over any [`KeyValueStore`]
///
/// Keys: `sandbox:{id}:simstate:{METHOD path}`.
#[derive(Debug, Clone)]
pub struct KvStateStore {
    kv: Arc<dyn KeyValueStore>,
}

impl KvStateStore {
    /// Wrap a key-value backend
    #[inline]
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Storage key for one endpoint's state
    #[must_use]
    pub fn key(sandbox: SandboxId, endpoint: &EndpointKey) -> String {
        format!("{}{endpoint}", Self::sandbox_prefix(sandbox))
    }

    fn sandbox_prefix(sandbox: SandboxId) -> String {
        format!("sandbox:{sandbox}:simstate:")
    }
}

#[async_trait]
impl SimulationStateStore for KvStateStore {
    async fn get(&self, sandbox: SandboxId, endpoint: &EndpointKey) -> SimulationResult<StateMap> {
        match self.kv.get(&Self::key(sandbox, endpoint)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(StateMap::new()),
        }
    }

    async fn put(&self, sandbox: SandboxId, endpoint: &EndpointKey, state: &StateMap) -> SimulationResult<()> {
        let raw = serde_json::to_string(state)?;
        self.kv.set(&Self::key(sandbox, endpoint), raw).await?;
        Ok(())
    }

    async fn clear_sandbox(&self, sandbox: SandboxId) -> SimulationResult<usize> {
        Ok(self.kv.delete_prefix(&Self::sandbox_prefix(sandbox)).await?)
    }
}

/// Decode one user's blob
///
/// A blob of a different shape (the endpoint was rebound to another plugin)
/// reads as absent so the plugin re-initializes it.
#[must_use]
pub fn load_user<T: DeserializeOwned>(state: &StateMap, user: &str) -> Option<T> {
    let raw = state.get(user)?;
    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(user, %err, "discarding simulation state of unexpected shape");
            None
        }
    }
}

/// Encode one user's blob back into the map
pub fn store_user<T: Serialize>(state: &mut StateMap, user: &str, value: &T) -> SimulationResult<()> {
    state.insert(user.to_string(), serde_json::to_value(value)?);
    Ok(())
}
