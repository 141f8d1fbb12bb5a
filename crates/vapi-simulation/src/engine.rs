//! Simulation engine
//!
//! Ties definitions, plugins and persisted state together:
//! - Definition management (register, enable/disable, lookup)
//! - Serialized read-modify-write of per-endpoint state
//! - Sandbox-wide cleanup on reset and deletion

use crate::definition::{
    KvSimulationRepository, MemorySimulationRepository, SimulationConfig, SimulationDefinition,
    SimulationRepository,
};
use crate::error::{SimulationError, SimulationResult};
use crate::kv::{KeyValueStore, MemoryKv};
use crate::plugin::PluginRegistry;
use crate::state::{KvStateStore, SimulationStateStore};
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use vapi_types::{EndpointKey, MockRequest, SandboxId};

/// Result of running the simulation step for a request
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationOutcome {
    /// No enabled simulation for the endpoint
    NotConfigured,
    /// Plugin or scenario produced a response
    Produced(Value),
    /// Simulation exists but yielded nothing; resolution continues
    Empty,
}

impl SimulationOutcome {
    /// Produced payload, if any
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Produced(value) => Some(value),
            Self::NotConfigured | Self::Empty => None,
        }
    }
}

type LockKey = (SandboxId, EndpointKey);

/// Simulation engine
#[derive(Debug)]
pub struct SimulationEngine {
    registry: PluginRegistry,
    definitions: Arc<dyn SimulationRepository>,
    state: Arc<dyn SimulationStateStore>,
    /// One async lock per (sandbox, endpoint) guarding the state RMW
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
    /// Shared by executions, exclusive for sandbox-wide reset and cleanup
    gates: DashMap<SandboxId, Arc<RwLock<()>>>,
}

impl SimulationEngine {
    /// Create engine over explicit backends
    #[must_use]
    pub fn new(
        registry: PluginRegistry,
        definitions: Arc<dyn SimulationRepository>,
        state: Arc<dyn SimulationStateStore>,
    ) -> Self {
        Self {
            registry,
            definitions,
            state,
            locks: DashMap::new(),
            gates: DashMap::new(),
        }
    }

    /// Create engine with built-in plugins and in-memory backends
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            PluginRegistry::with_builtins(),
            Arc::new(MemorySimulationRepository::new()),
            Arc::new(KvStateStore::new(Arc::new(MemoryKv::new()))),
        )
    }

    /// Create engine keeping definitions and state in one key-value backend
    #[must_use]
    pub fn with_kv(registry: PluginRegistry, kv: Arc<dyn KeyValueStore>) -> Self {
        Self::new(
            registry,
            Arc::new(KvSimulationRepository::new(Arc::clone(&kv))),
            Arc::new(KvStateStore::new(kv)),
        )
    }

    /// Plugin registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Enabled definition for an endpoint
    pub async fn get_simulation(
        &self,
        sandbox: SandboxId,
        endpoint: &EndpointKey,
    ) -> SimulationResult<Option<SimulationDefinition>> {
        Ok(self
            .definitions
            .get(sandbox, endpoint)
            .await?
            .filter(|d| d.enabled))
    }

    /// All definitions of a sandbox, enabled or not
    pub async fn list_simulations(&self, sandbox: SandboxId) -> SimulationResult<Vec<SimulationDefinition>> {
        self.definitions.list(sandbox).await
    }

    /// Bind a plugin or scenario to an endpoint
    ///
    /// Replaces any existing configuration for the key and re-enables it.
    /// Sandbox existence is checked by the caller.
    pub async fn register_simulation(
        &self,
        sandbox: SandboxId,
        endpoint: EndpointKey,
        config: SimulationConfig,
    ) -> SimulationResult<SimulationDefinition> {
        self.validate(&config)?;

        let definition = match self.definitions.get(sandbox, &endpoint).await? {
            Some(mut existing) => {
                existing.config = config;
                existing.enabled = true;
                existing.updated_at = Utc::now();
                existing
            }
            None => SimulationDefinition::new(sandbox, endpoint, config),
        };
        self.definitions.upsert(definition.clone()).await?;

        tracing::info!(
            sandbox = %sandbox,
            endpoint = %definition.endpoint,
            plugin = definition.config.plugin.as_deref().unwrap_or("-"),
            "simulation registered"
        );
        Ok(definition)
    }

    /// Enable or disable an existing simulation
    pub async fn set_enabled(
        &self,
        sandbox: SandboxId,
        endpoint: &EndpointKey,
        enabled: bool,
    ) -> SimulationResult<SimulationDefinition> {
        let mut definition = self
            .definitions
            .get(sandbox, endpoint)
            .await?
            .ok_or_else(|| SimulationError::NotFound {
                sandbox,
                endpoint: endpoint.clone(),
            })?;
        definition.enabled = enabled;
        definition.updated_at = Utc::now();
        self.definitions.upsert(definition.clone()).await?;
        Ok(definition)
    }

    /// Run the simulation bound to an endpoint
    ///
    /// A registered plugin takes precedence over a scenario. The state map is
    /// loaded, handed to the plugin and written back while holding the
    /// endpoint lock, so concurrent requests never lose an update. A reset or
    /// cleanup of the sandbox waits for executions in flight.
    pub async fn execute_simulation(
        &self,
        sandbox: SandboxId,
        endpoint: &EndpointKey,
        request: &MockRequest,
    ) -> SimulationResult<SimulationOutcome> {
        let gate = self.gate_for(sandbox);
        let _shared = gate.read().await;

        let Some(definition) = self.get_simulation(sandbox, endpoint).await? else {
            return Ok(SimulationOutcome::NotConfigured);
        };
        let config = &definition.config;

        if let Some(plugin) = config.plugin.as_deref().and_then(|name| self.registry.get(name)) {
            let lock = self.lock_for(sandbox, endpoint);
            let _guard = lock.lock().await;

            let mut state = self.state.get(sandbox, endpoint).await?;
            let produced = plugin.execute(config, request, &mut state)?;
            self.state.put(sandbox, endpoint, &state).await?;

            tracing::debug!(
                sandbox = %sandbox,
                endpoint = %endpoint,
                plugin = plugin.name(),
                user = request.requesting_user(),
                "simulation executed"
            );
            return Ok(produced.map_or(SimulationOutcome::Empty, SimulationOutcome::Produced));
        }

        Ok(config
            .scenario
            .clone()
            .map_or(SimulationOutcome::Empty, SimulationOutcome::Produced))
    }

    /// Forget all simulation state of a sandbox, keeping definitions
    pub async fn reset_state(&self, sandbox: SandboxId) -> SimulationResult<usize> {
        let gate = self.gate_for(sandbox);
        let _exclusive = gate.write().await;
        let removed = self.state.clear_sandbox(sandbox).await?;
        tracing::info!(sandbox = %sandbox, removed, "simulation state reset");
        Ok(removed)
    }

    /// Drop definitions, state and locks of a sandbox
    pub async fn clear_sandbox(&self, sandbox: SandboxId) -> SimulationResult<()> {
        let gate = self.gate_for(sandbox);
        {
            let _exclusive = gate.write().await;
            self.definitions.delete_sandbox(sandbox).await?;
            self.state.clear_sandbox(sandbox).await?;
            self.locks.retain(|(id, _), _| *id != sandbox);
        }
        drop(gate);
        self.gates
            .remove_if(&sandbox, |_, gate| Arc::strong_count(gate) == 1);
        Ok(())
    }

    fn validate(&self, config: &SimulationConfig) -> SimulationResult<()> {
        match (&config.plugin, &config.scenario) {
            (Some(name), None) if !self.registry.contains(name) => Err(SimulationError::Validation(
                format!(
                    "unknown plugin '{name}', expected one of: {}",
                    self.registry.names().join(", ")
                ),
            )),
            (None, None) => Err(SimulationError::Validation(
                "config needs a 'plugin' or a 'scenario'".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn gate_for(&self, sandbox: SandboxId) -> Arc<RwLock<()>> {
        Arc::clone(self.gates.entry(sandbox).or_default().value())
    }

    fn lock_for(&self, sandbox: SandboxId, endpoint: &EndpointKey) -> Arc<Mutex<()>> {
        self.locks
            .entry((sandbox, endpoint.clone()))
            .or_default()
            .value()
            .clone()
    }
}
