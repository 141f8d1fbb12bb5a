//! Live mock surface
//!
//! `ANY /sandbox/{id}/api/{*path}` is dispatched through the sandbox's route
//! table; a miss is a 404.

use super::{sandbox_id, AppState, SOURCE_HEADER};
use crate::error::ApiError;
use crate::tenant::user_from_headers;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{Map, Value};
use std::collections::HashMap;
use vapi_types::{HttpMethod, MockRequest};

type RawQuery = Result<Query<HashMap<String, String>>, QueryRejection>;

pub(super) async fn handle(
    State(state): State<AppState>,
    Path((id, path)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    query: RawQuery,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    resolve(&state, &id, &format!("/{path}"), &method, &headers, query, &body).await
}

pub(super) async fn handle_root(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    headers: HeaderMap,
    query: RawQuery,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    resolve(&state, &id, "/", &method, &headers, query, &body).await
}

async fn resolve(
    state: &AppState,
    id: &str,
    path: &str,
    method: &Method,
    headers: &HeaderMap,
    query: RawQuery,
    body: &Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let id = sandbox_id(id)?;
    let method = HttpMethod::parse(method.as_str())
        .ok_or_else(|| ApiError::not_found(format!("route {method} {path}")))?;
    let Query(query) = query?;

    let request = MockRequest {
        body: parse_body(body)?,
        query: query
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<String, Value>>(),
        params: Map::new(),
        user_id: user_from_headers(headers),
    };
    let resolved = state.service.handle(id, method, path, request).await?;
    Ok(([(SOURCE_HEADER, resolved.source.as_str())], Json(resolved.body)))
}

/// JSON body; empty means `null`
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))
}
