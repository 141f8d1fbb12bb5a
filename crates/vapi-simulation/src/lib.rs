//! # VAPI Simulation
//!
//! Stateful behavior for virtual endpoints.
//!
//! ## Key Features
//!
//! - **Plugins**: `balance`, `fraud` and `kyc` behind a [`SimulationPlugin`] trait
//! - **Scenarios**: literal responses bound to an endpoint
//! - **Per-user state**: one JSON map per (sandbox, endpoint), persisted in a
//!   [`KeyValueStore`] so it survives restarts with [`FileKv`]
//! - **No lost updates**: state read-modify-write is serialized per endpoint
//!
//! ## Example
//!
//! ```rust,no_run
//! use serde_json::json;
//! use vapi_simulation::{SimulationConfig, SimulationEngine};
//! use vapi_types::{EndpointKey, HttpMethod, MockRequest, SandboxId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SimulationEngine::in_memory();
//! let sandbox = SandboxId::new();
//! let endpoint = EndpointKey::new(HttpMethod::Post, "/payments");
//!
//! engine
//!     .register_simulation(sandbox, endpoint.clone(), SimulationConfig::plugin("balance"))
//!     .await?;
//!
//! let request = MockRequest::with_body(json!({"userId": "u1", "amount": 10, "type": "debit"}));
//! let outcome = engine.execute_simulation(sandbox, &endpoint, &request).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod clock;
pub mod definition;
pub mod engine;
pub mod error;
pub mod kv;
pub mod plugin;
pub mod plugins;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use definition::{
    KvSimulationRepository, MemorySimulationRepository, SimulationConfig, SimulationDefinition,
    SimulationRepository,
};
pub use engine::{SimulationEngine, SimulationOutcome};
pub use error::{SimulationError, SimulationResult};
pub use kv::{FileKv, KeyValueStore, KvError, MemoryKv};
pub use plugin::{PluginRegistry, SimulationPlugin};
pub use plugins::{BalancePlugin, FraudPlugin, KycPlugin};
pub use state::{load_user, store_user, KvStateStore, SimulationStateStore, StateMap};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
