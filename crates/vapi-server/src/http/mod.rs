//! HTTP surface
//!
//! - management routes under `/sandbox`, scoped by the tenant headers
//! - live mock routes under `/sandbox/{id}/api/...`, dispatched through the
//!   sandbox's route table
//! - `/health`

mod live;
mod management;

use crate::error::ApiError;
use axum::routing::{any, get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use vapi_core::SandboxService;
use vapi_types::SandboxId;

/// Response header naming the pipeline step that produced a live response
pub const SOURCE_HEADER: &str = "x-vapi-source";

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Sandbox lifecycle and live mock entry point
    pub service: SandboxService,
}

/// Build the application router
pub fn router(service: SandboxService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/sandbox",
            post(management::create_sandbox).get(management::list_sandboxes),
        )
        .route(
            "/sandbox/{id}",
            get(management::get_sandbox).delete(management::delete_sandbox),
        )
        .route("/sandbox/{id}/state", patch(management::update_state))
        .route("/sandbox/{id}/mocks/openapi", post(management::upload_spec))
        .route(
            "/sandbox/{id}/mocks/custom",
            post(management::save_mock).get(management::list_mocks),
        )
        .route(
            "/sandbox/{id}/simulations",
            post(management::register_simulation)
                .get(management::list_simulations)
                .patch(management::set_simulation_enabled),
        )
        .route("/sandbox/{id}/requests", get(management::requests))
        .route("/sandbox/{id}/api", any(live::handle_root))
        .route("/sandbox/{id}/api/{*path}", any(live::handle))
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// Serve `service` on `listener` until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    service: SandboxService,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn fallback() -> ApiError {
    ApiError::not_found("route")
}

/// Parse a sandbox id from a path segment; malformed ids are not found
fn sandbox_id(raw: &str) -> Result<SandboxId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("sandbox {raw}")))
}
