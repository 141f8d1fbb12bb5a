//! VAPI Core - sandbox API virtualization
//!
//! Turns stored OpenAPI documents into live mock routes:
//! - Derives one route per `(path, method)` under `/sandbox/{id}/api`
//! - Resolves each request through simulation, custom mock, then schema mock
//! - Records every resolved request
//! - Reloads a sandbox's routes atomically when its document changes
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use vapi_core::SandboxService;
//! use vapi_types::{HttpMethod, MockRequest, TenantContext};
//!
//! # async fn example(document: serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
//! let service = SandboxService::in_memory();
//! let tenant = TenantContext::new("team-a");
//!
//! let sandbox = service.create(&tenant, "payments", Some(&document)).await?;
//! let response = service
//!     .handle(sandbox.id, HttpMethod::Get, "/accounts/42", MockRequest::default())
//!     .await?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod schema;
pub mod service;

// Re-exports for convenience
pub use error::{ConflictError, VapiError, VapiResult};
pub use pipeline::{no_mock_body, ResolutionPipeline, ResolvedResponse};
pub use routes::{derive_routes, route_prefix, DerivedRoute, PathTemplate, RouteMatch, RouteSet, RouteTable};
pub use schema::{generate_mock, SchemaNode};
pub use service::{SandboxService, DEFAULT_REQUEST_LIMIT};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
