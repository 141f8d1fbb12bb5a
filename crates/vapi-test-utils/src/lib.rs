//! Testing utilities for VAPI workspace
//!
//! Shared OpenAPI fixtures and service setup.

#![allow(missing_docs)]

use serde_json::{json, Value};
use vapi_core::SandboxService;
use vapi_store::SandboxRecord;
use vapi_types::TenantContext;

pub const TEST_TEAM: &str = "team-test";
pub const TEST_USER: &str = "user-test";

pub fn test_tenant() -> TenantContext {
    TenantContext::new(TEST_TEAM).with_user(TEST_USER)
}

/// Petstore document with a `$ref`, a path parameter and a literal sibling
pub fn petstore_spec() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {"title": "Petstore", "version": "1.0.0"},
        "paths": {
            "/pets": {
                "get": {"responses": {"200": {"content": {"application/json": {"schema": {
                    "type": "array",
                    "items": {"$ref": "#/components/schemas/Pet"}
                }}}}}},
                "post": {"responses": {"201": {"description": "created"}}}
            },
            "/pets/{petId}": {
                "get": {"responses": {"200": {"content": {"application/json": {"schema": {
                    "$ref": "#/components/schemas/Pet"
                }}}}}}
            },
            "/pets/featured": {
                "get": {"responses": {"200": {"content": {"application/json": {"schema": {
                    "type": "object",
                    "properties": {"featured": {"type": "boolean"}}
                }}}}}}
            }
        },
        "components": {"schemas": {"Pet": {
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "name": {"type": "string", "example": "Rex"},
                "tag": {"type": ["string", "null"]}
            }
        }}}
    })
}

/// Document with the `{name: string, age: number}` user schema
pub fn users_spec() -> Value {
    json!({
        "openapi": "3.1.0",
        "info": {"title": "Users", "version": "1"},
        "paths": {"/users/{id}": {"get": {"responses": {"200": {"content": {"application/json": {
            "schema": {"type": "object", "properties": {"name": {"type": "string"}, "age": {"type": "number"}}}
        }}}}}}}
    })
}

pub fn setup_test_service() -> SandboxService {
    SandboxService::in_memory()
}

/// Service plus one sandbox of [`TEST_TEAM`] serving `spec`
pub async fn setup_sandbox(spec: &Value) -> (SandboxService, SandboxRecord) {
    let service = setup_test_service();
    let record = service
        .create(&test_tenant(), "test-sandbox", Some(spec))
        .await
        .unwrap();
    (service, record)
}
