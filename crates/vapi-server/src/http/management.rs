//! Management handlers

use super::{sandbox_id, AppState};
use crate::error::ApiError;
use crate::tenant::Tenant;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use vapi_simulation::SimulationConfig;
use vapi_store::{NewMock, SandboxState};

type JsonBody<T> = Result<Json<T>, JsonRejection>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateSandbox {
    name: String,
    #[serde(default)]
    openapi_spec: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateState {
    state: SandboxState,
}

#[derive(Debug, Deserialize)]
pub(super) struct UploadSpec {
    spec: Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct RegisterSimulation {
    endpoint: String,
    config: SimulationConfig,
}

#[derive(Debug, Deserialize)]
pub(super) struct SetSimulationEnabled {
    endpoint: String,
    enabled: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct RequestsQuery {
    limit: Option<usize>,
}

pub(super) async fn create_sandbox(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    body: JsonBody<CreateSandbox>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let record = state
        .service
        .create(&tenant, &body.name, body.openapi_spec.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub(super) async fn list_sandboxes(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.list(&tenant).await?))
}

pub(super) async fn get_sandbox(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = sandbox_id(&id)?;
    Ok(Json(state.service.get(&tenant, id).await?))
}

pub(super) async fn update_state(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
    body: JsonBody<UpdateState>,
) -> Result<impl IntoResponse, ApiError> {
    let id = sandbox_id(&id)?;
    let Json(body) = body?;
    Ok(Json(state.service.update_state(&tenant, id, body.state).await?))
}

pub(super) async fn delete_sandbox(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = sandbox_id(&id)?;
    state.service.delete(&tenant, id).await?;
    Ok(Json(json!({ "deleted": true })))
}

pub(super) async fn upload_spec(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
    body: JsonBody<UploadSpec>,
) -> Result<impl IntoResponse, ApiError> {
    let id = sandbox_id(&id)?;
    let Json(body) = body?;
    let record = state.service.upload_spec(&tenant, id, &body.spec).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "OpenAPI spec validated, saved, and routes reloaded",
            "openapi": record.openapi_spec,
        })),
    ))
}

pub(super) async fn save_mock(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
    body: JsonBody<NewMock>,
) -> Result<impl IntoResponse, ApiError> {
    let id = sandbox_id(&id)?;
    let Json(mock) = body?;
    let saved = state.service.save_mock(&tenant, id, mock).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub(super) async fn list_mocks(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = sandbox_id(&id)?;
    Ok(Json(state.service.list_mocks(&tenant, id).await?))
}

pub(super) async fn register_simulation(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
    body: JsonBody<RegisterSimulation>,
) -> Result<impl IntoResponse, ApiError> {
    let id = sandbox_id(&id)?;
    let Json(body) = body?;
    let definition = state
        .service
        .register_simulation(&tenant, id, &body.endpoint, body.config)
        .await?;
    Ok((StatusCode::CREATED, Json(definition)))
}

pub(super) async fn set_simulation_enabled(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
    body: JsonBody<SetSimulationEnabled>,
) -> Result<impl IntoResponse, ApiError> {
    let id = sandbox_id(&id)?;
    let Json(body) = body?;
    let definition = state
        .service
        .set_simulation_enabled(&tenant, id, &body.endpoint, body.enabled)
        .await?;
    Ok(Json(definition))
}

pub(super) async fn list_simulations(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = sandbox_id(&id)?;
    Ok(Json(state.service.list_simulations(&tenant, id).await?))
}

pub(super) async fn requests(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<String>,
    query: Result<Query<RequestsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = sandbox_id(&id)?;
    let Query(query) = query?;
    Ok(Json(state.service.requests(&tenant, id, query.limit).await?))
}
