//! VAPI Server
//!
//! HTTP surface and `vapi` command-line entry point:
//! - [`http::router`]: management API, live mock routes and health check
//! - [`config::ServerConfig`]: TOML file plus flag overrides
//! - [`telemetry::init_tracing`]: `EnvFilter` subscriber, pretty or JSON
//! - [`cli`]: `serve`, `validate` and `mock` subcommands

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod telemetry;
pub mod tenant;

pub use config::{ConfigError, LogFormat, ServerConfig};
pub use error::ApiError;
pub use http::{router, serve, AppState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
