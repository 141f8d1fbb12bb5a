//! End-to-end tests of the HTTP surface through `tower::ServiceExt::oneshot`

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;
use vapi_server::http::SOURCE_HEADER;
use vapi_server::router;
use vapi_server::tenant::{TEAM_HEADER, USER_HEADER};
use vapi_test_utils::{petstore_spec, setup_test_service, TEST_TEAM, TEST_USER};

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(app: &Router, method: &str, uri: &str, team: Option<&str>, body: Option<Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(team) = team {
        builder = builder.header(TEAM_HEADER, team).header(USER_HEADER, TEST_USER);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply { status, headers, body }
}

async fn petstore(app: &Router) -> String {
    let reply = send(
        app,
        "POST",
        "/sandbox",
        Some(TEST_TEAM),
        Some(json!({"name": "pets", "openapiSpec": petstore_spec()})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_needs_no_tenant() {
    let app = router(setup_test_service());
    let reply = send(&app, "GET", "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({"status": "ok"}));
}

#[tokio::test]
async fn management_requires_team_header() {
    let app = router(setup_test_service());
    let reply = send(&app, "GET", "/sandbox", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["code"], json!("unauthorized"));
}

#[tokio::test]
async fn created_sandbox_serves_schema_mocks() {
    let app = router(setup_test_service());
    let id = petstore(&app).await;

    let reply = send(&app, "GET", &format!("/sandbox/{id}/api/pets/1"), None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({"id": 0, "name": "Rex", "tag": "string"}));
    assert_eq!(reply.headers[SOURCE_HEADER], "schema");

    let reply = send(&app, "GET", &format!("/sandbox/{id}/api/pets"), None, None).await;
    assert_eq!(reply.body, json!([{"id": 0, "name": "Rex", "tag": "string"}]));
}

#[tokio::test]
async fn literal_path_beats_parameter() {
    let app = router(setup_test_service());
    let id = petstore(&app).await;
    let reply = send(&app, "GET", &format!("/sandbox/{id}/api/pets/featured"), None, None).await;
    assert_eq!(reply.body, json!({"featured": false}));
}

#[tokio::test]
async fn custom_mock_overrides_schema() {
    let app = router(setup_test_service());
    let id = petstore(&app).await;
    let reply = send(
        &app,
        "POST",
        &format!("/sandbox/{id}/mocks/custom"),
        Some(TEST_TEAM),
        Some(json!({"method": "get", "path": "/pets/{petId}", "response": {"name": "Custom"}})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["method"], json!("GET"));

    let reply = send(&app, "GET", &format!("/sandbox/{id}/api/pets/7"), None, None).await;
    assert_eq!(reply.body, json!({"name": "Custom"}));
    assert_eq!(reply.headers[SOURCE_HEADER], "custom_mock");

    let reply = send(&app, "GET", &format!("/sandbox/{id}/mocks/custom"), Some(TEST_TEAM), None).await;
    assert_eq!(reply.body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn balance_simulation_tracks_debits() {
    let app = router(setup_test_service());
    let id = petstore(&app).await;
    let reply = send(
        &app,
        "POST",
        &format!("/sandbox/{id}/simulations"),
        Some(TEST_TEAM),
        Some(json!({"endpoint": "POST /pets", "config": {"plugin": "balance", "initial": 100}})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

    let debit = json!({"userId": "u1", "amount": 30, "type": "debit"});
    send(&app, "POST", &format!("/sandbox/{id}/api/pets"), None, Some(debit.clone())).await;
    let reply = send(&app, "POST", &format!("/sandbox/{id}/api/pets"), None, Some(debit)).await;
    assert_eq!(reply.body, json!({"userId": "u1", "balance": 40}));
    assert_eq!(reply.headers[SOURCE_HEADER], "simulation");

    let reply = send(
        &app,
        "PATCH",
        &format!("/sandbox/{id}/simulations"),
        Some(TEST_TEAM),
        Some(json!({"endpoint": "POST /pets", "enabled": false})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let reply = send(&app, "POST", &format!("/sandbox/{id}/api/pets"), None, None).await;
    assert_eq!(reply.body, json!({"message": "No mock defined"}));
}

#[tokio::test]
async fn invalid_json_body_is_bad_request() {
    let app = router(setup_test_service());
    let id = petstore(&app).await;
    let request = Request::builder()
        .method("POST")
        .uri(format!("/sandbox/{id}/api/pets"))
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_spec_upload_is_rejected() {
    let app = router(setup_test_service());
    let id = petstore(&app).await;
    let reply = send(
        &app,
        "POST",
        &format!("/sandbox/{id}/mocks/openapi"),
        Some(TEST_TEAM),
        Some(json!({"spec": {"openapi": "3.0.0", "info": {"title": "t", "version": "1"}}})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], json!("invalid_spec"));
    assert_eq!(reply.body["message"], json!("'paths' must be an object"));

    let reply = send(&app, "GET", &format!("/sandbox/{id}/api/pets/1"), None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn uploaded_spec_replaces_routes() {
    let app = router(setup_test_service());
    let id = petstore(&app).await;
    let reply = send(
        &app,
        "POST",
        &format!("/sandbox/{id}/mocks/openapi"),
        Some(TEST_TEAM),
        Some(json!({"spec": vapi_test_utils::users_spec()})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

    let reply = send(&app, "GET", &format!("/sandbox/{id}/api/users/3"), None, None).await;
    assert_eq!(reply.body, json!({"name": "string", "age": 0}));
    let reply = send(&app, "GET", &format!("/sandbox/{id}/api/pets/1"), None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_team_cannot_see_sandbox() {
    let app = router(setup_test_service());
    let id = petstore(&app).await;
    let reply = send(&app, "GET", &format!("/sandbox/{id}"), Some("team-other"), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["code"], json!("not_found"));

    let reply = send(&app, "GET", "/sandbox", Some("team-other"), None).await;
    assert_eq!(reply.body, json!([]));
}

#[tokio::test]
async fn state_update_and_delete() {
    let app = router(setup_test_service());
    let id = petstore(&app).await;
    let reply = send(
        &app,
        "PATCH",
        &format!("/sandbox/{id}/state"),
        Some(TEST_TEAM),
        Some(json!({"state": "running"})),
    )
    .await;
    assert_eq!(reply.body["state"], json!("running"));

    let reply = send(&app, "DELETE", &format!("/sandbox/{id}"), Some(TEST_TEAM), None).await;
    assert_eq!(reply.body, json!({"deleted": true}));

    let reply = send(&app, "GET", &format!("/sandbox/{id}/api/pets/1"), None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    let reply = send(&app, "GET", &format!("/sandbox/{id}"), Some(TEST_TEAM), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_log_is_newest_first() {
    let app = router(setup_test_service());
    let id = petstore(&app).await;
    for pet in ["a", "b", "c"] {
        send(&app, "GET", &format!("/sandbox/{id}/api/pets/{pet}?verbose=1"), None, None).await;
    }
    let reply = send(&app, "GET", &format!("/sandbox/{id}/requests?limit=2"), Some(TEST_TEAM), None).await;
    let log = reply.body.as_array().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0]["request"]["params"]["petId"], json!("c"));
    assert_eq!(log[0]["request"]["query"]["verbose"], json!("1"));
    assert_eq!(log[1]["request"]["params"]["petId"], json!("b"));
    assert_eq!(log[0]["source"], json!("schema"));
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = router(setup_test_service());
    let id = petstore(&app).await;
    for uri in [
        format!("/sandbox/{id}/api/owners"),
        "/sandbox/not-a-uuid/api/pets".to_string(),
        "/nowhere".to_string(),
    ] {
        let reply = send(&app, "GET", &uri, None, None).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(reply.body["code"], json!("not_found"), "{uri}");
    }
    let reply = send(&app, "DELETE", &format!("/sandbox/{id}/api/pets"), None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
