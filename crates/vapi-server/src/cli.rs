//! Command-line interface
//!
//! ```text
//! vapi serve [--config vapi.toml] [--bind 0.0.0.0:3000] [--state-dir DIR] ...
//! vapi validate openapi.yaml
//! vapi mock openapi.yaml GET /users/{id}
//! ```

use crate::config::{ConfigError, LogFormat, ServerConfig};
use crate::telemetry::init_tracing;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use vapi_core::{derive_routes, generate_mock, no_mock_body, VapiError, VapiResult};
use vapi_store::validate_spec;
use vapi_types::HttpMethod;

/// Top-level arguments
#[derive(Debug, Parser)]
#[command(name = "vapi", version, about = "Sandbox API virtualization server")]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Validate an OpenAPI document (JSON or YAML) and print its routes
    Validate {
        /// Document path
        file: PathBuf,
    },
    /// Print the schema-derived mock of one operation
    Mock {
        /// Document path
        file: PathBuf,
        /// HTTP method
        method: String,
        /// Declared path, e.g. `/users/{id}`
        path: String,
    },
}

/// `serve` flags; each overrides the config file
#[derive(Debug, Default, Args)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Listen address
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Directory for durable state
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
    /// Entries per store cache
    #[arg(long)]
    pub cache_capacity: Option<u64>,
    /// Request log entries kept per sandbox
    #[arg(long)]
    pub recorder_retention: Option<usize>,
    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl ServeArgs {
    /// Config file (or defaults) with flags applied on top
    pub async fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path).await?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = self.bind {
            config = config.with_bind(bind);
        }
        if let Some(dir) = &self.state_dir {
            config = config.with_state_dir(dir.clone());
        }
        if let Some(capacity) = self.cache_capacity {
            config = config.with_cache_capacity(capacity);
        }
        if let Some(retention) = self.recorder_retention {
            config = config.with_recorder_retention(retention);
        }
        if let Some(format) = self.log_format {
            config = config.with_log_format(format);
        }
        Ok(config)
    }
}

/// Parse a document as JSON, falling back to YAML
///
/// # Errors
/// When the text is neither.
pub fn parse_document(text: &str) -> anyhow::Result<Value> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(_) => serde_yaml::from_str(text).context("document is neither JSON nor YAML"),
    }
}

async fn read_document(path: &Path) -> anyhow::Result<Value> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_document(&text)
}

/// Human-readable summary of a valid document's live routes
///
/// # Errors
/// [`VapiError::InvalidSpec`] when the document fails validation.
pub fn validate_report(document: &Value) -> VapiResult<String> {
    let spec = validate_spec(document)?;
    let (routes, conflicts) = derive_routes(&spec);
    let mut report = format!("{} {}: {} routes\n", spec.title(), spec.version(), routes.len());
    for route in &routes {
        let _ = writeln!(report, "  {}", route.endpoint);
    }
    for conflict in &conflicts {
        let _ = writeln!(report, "warning: {conflict}");
    }
    Ok(report)
}

/// Schema-derived mock of one operation
///
/// # Errors
/// - [`VapiError::InvalidSpec`] when the document fails validation
/// - [`VapiError::Validation`] for an unknown method
/// - [`VapiError::NotFound`] when the document has no such operation
pub fn mock_for(document: &Value, method: &str, path: &str) -> VapiResult<Value> {
    let spec = validate_spec(document)?;
    let method = HttpMethod::parse(method)
        .ok_or_else(|| VapiError::validation(format!("unknown method '{method}'")))?;
    let operation = spec
        .operation(method, path)
        .ok_or_else(|| VapiError::not_found(format!("operation {method} {path}")))?;
    Ok(operation
        .response_schema
        .as_ref()
        .map_or_else(no_mock_body, generate_mock))
}

/// Run a parsed command line
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Validate { file } => {
            let document = read_document(&file).await?;
            print!("{}", validate_report(&document)?);
            Ok(())
        }
        Command::Mock { file, method, path } => {
            let document = read_document(&file).await?;
            let mock = mock_for(&document, &method, &path)?;
            println!("{}", serde_json::to_string_pretty(&mock)?);
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.resolve().await?;
    init_tracing(config.log_format)?;

    let service = config
        .build_service()
        .await
        .context("cannot open state directory")?;
    let restored = service.restore_routes().await?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;
    tracing::info!(
        addr = %config.bind,
        state_dir = ?config.state_dir,
        restored,
        "VAPI server listening"
    );

    crate::http::serve(listener, service, shutdown_signal()).await?;
    tracing::info!("VAPI server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
    }
}
