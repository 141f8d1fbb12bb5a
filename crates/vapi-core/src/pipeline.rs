//! Resolution pipeline
//!
//! Decides what a live mock route answers. Strict precedence, the first step
//! that yields a value wins:
//!
//! ```text
//! request ─→ simulation ─→ custom mock ─→ schema-derived mock ─→ recorder ─→ response
//! ```
//!
//! An operation without a response schema answers `{"message": "No mock defined"}`,
//! tagged [`ResponseSource::Placeholder`].
//!
//! Lookup failures are hard errors; only recording is best-effort.

use crate::error::VapiResult;
use crate::schema::generate_mock;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use vapi_recorder::{RecordedRequest, RequestRecorder, ResponseSource};
use vapi_simulation::{SimulationEngine, SimulationOutcome};
use vapi_store::{MockDefinition, SandboxStore};
use vapi_types::{EndpointKey, MockRequest, SandboxId};

/// Body returned when neither a mock nor a response schema exists
#[must_use]
pub fn no_mock_body() -> Value {
    json!({ "message": "No mock defined" })
}

/// Response produced by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResponse {
    /// JSON body
    pub body: Value,
    /// Step that produced the body
    pub source: ResponseSource,
}

impl ResolvedResponse {
    /// Create response
    #[inline]
    #[must_use]
    pub fn new(body: Value, source: ResponseSource) -> Self {
        Self { body, source }
    }
}

/// Simulation → custom mock → schema mock resolution
#[derive(Debug, Clone)]
pub struct ResolutionPipeline {
    simulations: Arc<SimulationEngine>,
    store: SandboxStore,
    recorder: Arc<dyn RequestRecorder>,
}

impl ResolutionPipeline {
    /// Create pipeline over shared components
    #[must_use]
    pub fn new(
        simulations: Arc<SimulationEngine>,
        store: SandboxStore,
        recorder: Arc<dyn RequestRecorder>,
    ) -> Self {
        Self {
            simulations,
            store,
            recorder,
        }
    }

    /// Resolve the response for one request and record it
    ///
    /// # Errors
    /// Store or simulation failures; nothing falls through on error.
    pub async fn resolve(
        &self,
        sandbox: SandboxId,
        endpoint: &EndpointKey,
        request: &MockRequest,
    ) -> VapiResult<ResolvedResponse> {
        let resolved = self.lookup(sandbox, endpoint, request).await?;
        tracing::debug!(
            sandbox = %sandbox,
            endpoint = %endpoint,
            source = resolved.source.as_str(),
            "request resolved"
        );

        let entry = RecordedRequest::now(endpoint.clone(), request, resolved.body.clone(), resolved.source);
        if let Err(e) = self.recorder.record(sandbox, entry).await {
            tracing::warn!(sandbox = %sandbox, endpoint = %endpoint, error = %e, "request not recorded");
        }
        Ok(resolved)
    }

    async fn lookup(
        &self,
        sandbox: SandboxId,
        endpoint: &EndpointKey,
        request: &MockRequest,
    ) -> VapiResult<ResolvedResponse> {
        if let SimulationOutcome::Produced(body) =
            self.simulations.execute_simulation(sandbox, endpoint, request).await?
        {
            return Ok(ResolvedResponse::new(body, ResponseSource::Simulation));
        }

        if let Some(mock) = self
            .store
            .get_mock_definition(sandbox, endpoint.path(), endpoint.method().as_str())
            .await?
        {
            if let Some(delay) = mock.delay_ms.filter(|ms| *ms > 0) {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            return Ok(ResolvedResponse::new(mock_payload(&mock), ResponseSource::CustomMock));
        }

        let generated = self.store.get_spec(sandbox).await?.and_then(|spec| {
            spec.operation(endpoint.method(), endpoint.path())
                .and_then(|op| op.response_schema.as_ref())
                .map(generate_mock)
        });
        Ok(match generated {
            Some(body) => ResolvedResponse::new(body, ResponseSource::Schema),
            None => ResolvedResponse::new(no_mock_body(), ResponseSource::Placeholder),
        })
    }
}

/// Payload of a custom mock; randomized arrays yield one uniform element
fn mock_payload(mock: &MockDefinition) -> Value {
    match &mock.response {
        Value::Array(items) if mock.is_randomized && !items.is_empty() => {
            items[rand::rng().random_range(0..items.len())].clone()
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use vapi_recorder::{MemoryRecorder, RecorderError};
    use vapi_simulation::SimulationConfig;
    use vapi_store::{validate_spec, NewMock};
    use vapi_types::HttpMethod;

    #[derive(Debug)]
    struct FailingRecorder;

    #[async_trait]
    impl RequestRecorder for FailingRecorder {
        async fn record(&self, sandbox: SandboxId, _entry: RecordedRequest) -> Result<(), RecorderError> {
            Err(RecorderError::write_failed(sandbox, "disk full"))
        }

        async fn recent(&self, _sandbox: SandboxId, _limit: usize) -> Result<Vec<RecordedRequest>, RecorderError> {
            Ok(Vec::new())
        }

        async fn clear(&self, _sandbox: SandboxId) -> Result<(), RecorderError> {
            Ok(())
        }
    }

    struct Fixture {
        pipeline: ResolutionPipeline,
        store: SandboxStore,
        simulations: Arc<SimulationEngine>,
        recorder: Arc<MemoryRecorder>,
        sandbox: SandboxId,
    }

    fn users_spec() -> Value {
        json!({
            "openapi": "3.0.3",
            "info": {"title": "Users", "version": "1"},
            "paths": {
                "/users/{id}": {"get": {"responses": {
                    "200": {"content": {"application/json": {"schema": {
                        "type": "object",
                        "properties": {"name": {"type": "string"}, "age": {"type": "number"}}
                    }}}}
                }}},
                "/ping": {"get": {"responses": {"204": {"description": "empty"}}}}
            }
        })
    }

    async fn fixture() -> Fixture {
        let store = SandboxStore::in_memory();
        let simulations = Arc::new(SimulationEngine::in_memory());
        let recorder = Arc::new(MemoryRecorder::new(100));
        let spec = validate_spec(&users_spec()).unwrap();
        let sandbox = store.create_sandbox("users", "team", Some(spec)).await.unwrap().id;
        let pipeline = ResolutionPipeline::new(
            Arc::clone(&simulations),
            store.clone(),
            Arc::clone(&recorder) as Arc<dyn RequestRecorder>,
        );
        Fixture {
            pipeline,
            store,
            simulations,
            recorder,
            sandbox,
        }
    }

    fn get_user() -> EndpointKey {
        EndpointKey::new(HttpMethod::Get, "/users/{id}")
    }

    #[tokio::test]
    async fn schema_mock_when_nothing_else_defined() {
        let f = fixture().await;
        let resolved = f.pipeline.resolve(f.sandbox, &get_user(), &MockRequest::default()).await.unwrap();
        assert_eq!(resolved.body, json!({"name": "string", "age": 0}));
        assert_eq!(resolved.source, ResponseSource::Schema);
    }

    #[tokio::test]
    async fn missing_schema_yields_placeholder_message() {
        let f = fixture().await;
        let ping = EndpointKey::new(HttpMethod::Get, "/ping");
        let resolved = f.pipeline.resolve(f.sandbox, &ping, &MockRequest::default()).await.unwrap();
        assert_eq!(resolved.body, no_mock_body());
        assert_eq!(resolved.source, ResponseSource::Placeholder);
        assert_eq!(f.recorder.entries(f.sandbox)[0].source, ResponseSource::Placeholder);
    }

    #[tokio::test]
    async fn custom_mock_beats_schema() {
        let f = fixture().await;
        f.store
            .save_mock_definition(f.sandbox, NewMock::new("get", "/users/{id}", json!({"name": "Ada"})))
            .await
            .unwrap();
        let resolved = f.pipeline.resolve(f.sandbox, &get_user(), &MockRequest::default()).await.unwrap();
        assert_eq!(resolved.body, json!({"name": "Ada"}));
        assert_eq!(resolved.source, ResponseSource::CustomMock);
    }

    #[tokio::test]
    async fn simulation_beats_custom_mock() {
        let f = fixture().await;
        f.store
            .save_mock_definition(f.sandbox, NewMock::new("GET", "/users/{id}", json!({"name": "Ada"})))
            .await
            .unwrap();
        f.simulations
            .register_simulation(f.sandbox, get_user(), SimulationConfig::scenario(json!({"simulated": true})))
            .await
            .unwrap();
        let resolved = f.pipeline.resolve(f.sandbox, &get_user(), &MockRequest::default()).await.unwrap();
        assert_eq!(resolved.body, json!({"simulated": true}));
        assert_eq!(resolved.source, ResponseSource::Simulation);
    }

    #[tokio::test]
    async fn randomized_mock_picks_an_element() {
        let f = fixture().await;
        let choices = json!([{"n": 1}, {"n": 2}, {"n": 3}]);
        f.store
            .save_mock_definition(f.sandbox, NewMock::new("GET", "/users/{id}", choices.clone()).randomized())
            .await
            .unwrap();
        for _ in 0..10 {
            let resolved = f.pipeline.resolve(f.sandbox, &get_user(), &MockRequest::default()).await.unwrap();
            assert!(choices.as_array().unwrap().contains(&resolved.body));
        }
    }

    #[tokio::test]
    async fn randomized_empty_array_is_verbatim() {
        let f = fixture().await;
        f.store
            .save_mock_definition(f.sandbox, NewMock::new("GET", "/users/{id}", json!([])).randomized())
            .await
            .unwrap();
        let resolved = f.pipeline.resolve(f.sandbox, &get_user(), &MockRequest::default()).await.unwrap();
        assert_eq!(resolved.body, json!([]));
    }

    #[tokio::test]
    async fn delay_is_applied() {
        let f = fixture().await;
        f.store
            .save_mock_definition(f.sandbox, NewMock::new("GET", "/users/{id}", json!(1)).with_delay_ms(50))
            .await
            .unwrap();
        let started = std::time::Instant::now();
        f.pipeline.resolve(f.sandbox, &get_user(), &MockRequest::default()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn delay_suspends_only_its_own_request() {
        let f = fixture().await;
        f.store
            .save_mock_definition(f.sandbox, NewMock::new("GET", "/users/{id}", json!(1)).with_delay_ms(500))
            .await
            .unwrap();
        let ping = EndpointKey::new(HttpMethod::Get, "/ping");
        let started = std::time::Instant::now();

        let (slow, fast) = tokio::join!(
            async {
                f.pipeline.resolve(f.sandbox, &get_user(), &MockRequest::default()).await.unwrap();
                started.elapsed()
            },
            async {
                f.pipeline.resolve(f.sandbox, &ping, &MockRequest::default()).await.unwrap();
                started.elapsed()
            },
        );
        assert!(slow >= Duration::from_millis(500), "{slow:?}");
        assert!(fast < Duration::from_millis(250), "{fast:?}");
    }

    #[tokio::test]
    async fn every_resolution_is_recorded() {
        let f = fixture().await;
        let request = MockRequest::with_body(json!({"q": 1}));
        f.pipeline.resolve(f.sandbox, &get_user(), &request).await.unwrap();
        let entries = f.recorder.entries(f.sandbox);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].endpoint, get_user());
        assert_eq!(entries[0].request.body, json!({"q": 1}));
        assert_eq!(entries[0].source, ResponseSource::Schema);
    }

    #[tokio::test]
    async fn recorder_failure_does_not_fail_request() {
        let f = fixture().await;
        let pipeline = ResolutionPipeline::new(f.simulations, f.store, Arc::new(FailingRecorder));
        let resolved = pipeline.resolve(f.sandbox, &get_user(), &MockRequest::default()).await.unwrap();
        assert_eq!(resolved.source, ResponseSource::Schema);
    }

    #[tokio::test]
    async fn unknown_sandbox_falls_back_to_placeholder() {
        let f = fixture().await;
        let resolved = f
            .pipeline
            .resolve(SandboxId::new(), &get_user(), &MockRequest::default())
            .await
            .unwrap();
        assert_eq!(resolved.body, no_mock_body());
        assert_eq!(resolved.source, ResponseSource::Placeholder);
    }
}
