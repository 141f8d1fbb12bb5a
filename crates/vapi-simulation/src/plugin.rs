//! Plugin trait and registry
//!
//! Provides [`PluginRegistry`] for looking up simulation plugins by name.

use crate::clock::{Clock, SystemClock};
use crate::definition::SimulationConfig;
use crate::error::SimulationResult;
use crate::plugins::{BalancePlugin, FraudPlugin, KycPlugin};
use crate::state::StateMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use vapi_types::MockRequest;

/// Stateful behavior unit bound to an endpoint
///
/// `execute` receives the whole state map of the endpoint and mutates the
/// entry of the requesting user in place; the engine persists the map after
/// the call returns. `Ok(None)` means the plugin had nothing to say and the
/// request falls through to the next resolution step.
pub trait SimulationPlugin: Send + Sync + std::fmt::Debug {
    /// Registry name
    fn name(&self) -> &'static str;

    /// Compute a response and update state
    fn execute(
        &self,
        config: &SimulationConfig,
        request: &MockRequest,
        state: &mut StateMap,
    ) -> SimulationResult<Option<Value>>;
}

/// Registry of available simulation plugins
#[derive(Debug, Default, Clone)]
pub struct PluginRegistry {
    plugins: BTreeMap<&'static str, Arc<dyn SimulationPlugin>>,
}

impl PluginRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry with `balance`, `fraud` and `kyc` on the wall clock
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create registry with the built-ins, time-driven ones reading `clock`
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BalancePlugin));
        registry.register(Arc::new(FraudPlugin));
        registry.register(Arc::new(KycPlugin::new(clock)));
        registry
    }

    /// Register a plugin, replacing any plugin of the same name
    pub fn register(&mut self, plugin: Arc<dyn SimulationPlugin>) {
        self.plugins.insert(plugin.name(), plugin);
    }

    /// Look up plugin by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn SimulationPlugin>> {
        self.plugins.get(name).cloned()
    }

    /// Check if plugin exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// List all registered plugin names, sorted
    #[inline]
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.keys().copied().collect()
    }

    /// Get number of registered plugins
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
