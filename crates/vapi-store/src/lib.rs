//! # VAPI Store
//!
//! Persistence for sandboxes, their OpenAPI documents and custom mocks.
//!
//! ## Key Features
//!
//! - **Validation**: [`validate_spec`] checks OpenAPI 3.x / Swagger 2.0 structure,
//!   inlines internal `$ref`s and compiles every response schema
//! - **Read-through cache**: moka-backed [`StoreCache`] in front of the repositories
//! - **Write-through mocks**: a saved mock is readable immediately
//! - **Pluggable backends**: repositories share the simulation engine's
//!   [`KeyValueStore`](vapi_simulation::KeyValueStore) (memory or directory)

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod error;
pub mod model;
pub mod openapi;
pub mod repository;
pub mod store;

pub use cache::{MockKey, StoreCache, DEFAULT_CAPACITY};
pub use error::{InvalidSpecError, StoreError, StoreResult};
pub use model::{MockDefinition, NewMock, SandboxRecord, SandboxState};
pub use openapi::{validate_spec, Operation, ValidatedSpec};
pub use repository::{KvMockRepository, KvSandboxRepository, MockRepository, SandboxRepository};
pub use store::SandboxStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
