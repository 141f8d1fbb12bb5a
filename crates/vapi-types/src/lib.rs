//! VAPI shared types
//!
//! Foundation types used by every crate in the workspace:
//! - [`SandboxId`]: identifier of one tenant sandbox
//! - [`HttpMethod`] and [`EndpointKey`]: the `"METHOD path"` operation key
//! - [`MockRequest`] and [`TenantContext`]: what a live mock handler sees
//!
//! Components exchange data by value; nothing in here holds shared state.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod endpoint;
pub mod id;
pub mod request;

pub use endpoint::{EndpointKey, EndpointKeyError, HttpMethod};
pub use id::{SandboxId, SandboxIdError};
pub use request::{MockRequest, TenantContext, UNKNOWN_USER};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
