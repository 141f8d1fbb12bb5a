//! Sandbox service
//!
//! Team-scoped lifecycle operations over the store, the simulation engine,
//! the request log and the live route table. A sandbox owned by another team
//! is reported as not found.
//!
//! Operations that change what a sandbox is (document upload, state changes,
//! mock and simulation writes, deletion) hold a per-sandbox lifecycle lock and
//! re-read the record under it, so a delete never interleaves with a write
//! that would bring the sandbox's routes or data back.

use crate::error::{VapiError, VapiResult};
use crate::pipeline::{ResolutionPipeline, ResolvedResponse};
use crate::routes::{RouteMatch, RouteTable};
use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use vapi_recorder::{MemoryRecorder, RecordedRequest, RequestRecorder};
use vapi_simulation::{
    KeyValueStore, MemoryKv, PluginRegistry, SimulationConfig, SimulationDefinition, SimulationEngine,
};
use vapi_store::{
    validate_spec, MockDefinition, NewMock, SandboxRecord, SandboxState, SandboxStore, DEFAULT_CAPACITY,
};
use vapi_types::{EndpointKey, HttpMethod, MockRequest, SandboxId, TenantContext};

/// Entries returned by [`SandboxService::requests`] when no limit is given
pub const DEFAULT_REQUEST_LIMIT: usize = 100;

/// Sandbox lifecycle and live mock entry point
#[derive(Debug, Clone)]
pub struct SandboxService {
    store: SandboxStore,
    simulations: Arc<SimulationEngine>,
    recorder: Arc<dyn RequestRecorder>,
    routes: Arc<RouteTable>,
    lifecycle: Arc<DashMap<SandboxId, Arc<Mutex<()>>>>,
}

impl SandboxService {
    /// Create service over shared components
    #[must_use]
    pub fn new(
        store: SandboxStore,
        simulations: Arc<SimulationEngine>,
        recorder: Arc<dyn RequestRecorder>,
    ) -> Self {
        let pipeline = ResolutionPipeline::new(Arc::clone(&simulations), store.clone(), Arc::clone(&recorder));
        Self {
            store,
            simulations,
            recorder,
            routes: Arc::new(RouteTable::new(pipeline)),
            lifecycle: Arc::new(DashMap::new()),
        }
    }

    /// Create service keeping sandboxes, mocks, simulations and state in `kv`
    #[must_use]
    pub fn with_kv(kv: Arc<dyn KeyValueStore>, cache_capacity: u64, recorder_retention: usize) -> Self {
        Self::new(
            SandboxStore::with_kv(Arc::clone(&kv), cache_capacity),
            Arc::new(SimulationEngine::with_kv(PluginRegistry::with_builtins(), kv)),
            Arc::new(MemoryRecorder::new(recorder_retention)),
        )
    }

    /// Create service over in-process backends
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_kv(
            Arc::new(MemoryKv::new()),
            DEFAULT_CAPACITY,
            vapi_recorder::memory::DEFAULT_RETENTION,
        )
    }

    /// Store handle
    #[inline]
    #[must_use]
    pub fn store(&self) -> &SandboxStore {
        &self.store
    }

    /// Simulation engine handle
    #[inline]
    #[must_use]
    pub fn simulations(&self) -> &Arc<SimulationEngine> {
        &self.simulations
    }

    /// Live route table
    #[inline]
    #[must_use]
    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    /// Create a sandbox, registering its routes when a document is given
    ///
    /// # Errors
    /// - [`VapiError::InvalidSpec`] when the document fails validation
    /// - [`VapiError::Validation`] when the name is empty
    pub async fn create(
        &self,
        tenant: &TenantContext,
        name: &str,
        document: Option<&Value>,
    ) -> VapiResult<SandboxRecord> {
        let spec = document.map(validate_spec).transpose()?;
        let record = self.store.create_sandbox(name, &tenant.team_id, spec).await?;
        if let Some(spec) = &record.openapi_spec {
            self.routes.register_routes(record.id, spec).await;
        }
        Ok(record)
    }

    /// Sandbox owned by the tenant's team
    pub async fn get(&self, tenant: &TenantContext, id: SandboxId) -> VapiResult<SandboxRecord> {
        match self.store.get_sandbox(id).await? {
            Some(record) if record.team_id == tenant.team_id => Ok(record),
            _ => Err(VapiError::not_found(format!("sandbox {id}"))),
        }
    }

    /// All sandboxes of the tenant's team
    pub async fn list(&self, tenant: &TenantContext) -> VapiResult<Vec<SandboxRecord>> {
        Ok(self.store.list_sandboxes(Some(&tenant.team_id)).await?)
    }

    /// Move a sandbox to a new state
    ///
    /// Entering [`SandboxState::Reset`] forgets all simulation state and the
    /// request log; definitions and mocks are kept.
    pub async fn update_state(
        &self,
        tenant: &TenantContext,
        id: SandboxId,
        state: SandboxState,
    ) -> VapiResult<SandboxRecord> {
        self.exclusive(id, async {
            self.get(tenant, id).await?;
            let record = self.store.update_state(id, state).await?;
            if state == SandboxState::Reset {
                self.simulations.reset_state(id).await?;
                self.clear_log(id).await;
            }
            Ok(record)
        })
        .await
    }

    /// Validate and store a new document, then reload the sandbox's routes
    pub async fn upload_spec(
        &self,
        tenant: &TenantContext,
        id: SandboxId,
        document: &Value,
    ) -> VapiResult<SandboxRecord> {
        self.exclusive(id, async {
            self.get(tenant, id).await?;
            let spec = validate_spec(document)?;
            let record = self.store.save_spec(id, spec).await?;
            if let Some(spec) = &record.openapi_spec {
                self.routes.reload_routes(id, spec).await;
            }
            Ok(record)
        })
        .await
    }

    /// Create or overwrite a custom mock
    pub async fn save_mock(
        &self,
        tenant: &TenantContext,
        id: SandboxId,
        mock: NewMock,
    ) -> VapiResult<MockDefinition> {
        self.exclusive(id, async {
            self.get(tenant, id).await?;
            Ok(self.store.save_mock_definition(id, mock).await?)
        })
        .await
    }

    /// Custom mocks of a sandbox
    pub async fn list_mocks(&self, tenant: &TenantContext, id: SandboxId) -> VapiResult<Vec<MockDefinition>> {
        self.get(tenant, id).await?;
        Ok(self.store.list_mocks(id).await?)
    }

    /// Bind a simulation to an endpoint given as `"METHOD path"`
    ///
    /// # Errors
    /// [`VapiError::Validation`] for a malformed endpoint or config.
    pub async fn register_simulation(
        &self,
        tenant: &TenantContext,
        id: SandboxId,
        endpoint: &str,
        config: SimulationConfig,
    ) -> VapiResult<SimulationDefinition> {
        let endpoint = parse_endpoint(endpoint)?;
        self.exclusive(id, async {
            self.get(tenant, id).await?;
            Ok(self.simulations.register_simulation(id, endpoint, config).await?)
        })
        .await
    }

    /// Enable or disable a registered simulation
    pub async fn set_simulation_enabled(
        &self,
        tenant: &TenantContext,
        id: SandboxId,
        endpoint: &str,
        enabled: bool,
    ) -> VapiResult<SimulationDefinition> {
        let endpoint = parse_endpoint(endpoint)?;
        self.exclusive(id, async {
            self.get(tenant, id).await?;
            Ok(self.simulations.set_enabled(id, &endpoint, enabled).await?)
        })
        .await
    }

    /// Simulations of a sandbox, enabled or not
    pub async fn list_simulations(
        &self,
        tenant: &TenantContext,
        id: SandboxId,
    ) -> VapiResult<Vec<SimulationDefinition>> {
        self.get(tenant, id).await?;
        Ok(self.simulations.list_simulations(id).await?)
    }

    /// Newest-first request log of a sandbox
    pub async fn requests(
        &self,
        tenant: &TenantContext,
        id: SandboxId,
        limit: Option<usize>,
    ) -> VapiResult<Vec<RecordedRequest>> {
        self.get(tenant, id).await?;
        Ok(self
            .recorder
            .recent(id, limit.unwrap_or(DEFAULT_REQUEST_LIMIT))
            .await?)
    }

    /// Delete a sandbox and everything it owns
    ///
    /// Routes go first so no request resolves against half-deleted data.
    pub async fn delete(&self, tenant: &TenantContext, id: SandboxId) -> VapiResult<()> {
        self.exclusive(id, async {
            self.get(tenant, id).await?;
            self.routes.unregister_routes(id).await;
            self.store.delete_sandbox_data(id).await?;
            self.simulations.clear_sandbox(id).await?;
            self.clear_log(id).await;
            self.store.delete_sandbox(id).await?;
            Ok(())
        })
        .await
    }

    /// Register the routes of every stored sandbox that has a document
    ///
    /// Returns the number of sandboxes whose routes went live.
    pub async fn restore_routes(&self) -> VapiResult<usize> {
        let mut restored = 0;
        for record in self.store.list_sandboxes(None).await? {
            if let Some(spec) = &record.openapi_spec {
                self.routes.register_routes(record.id, spec).await;
                restored += 1;
            }
        }
        tracing::info!(sandboxes = restored, "routes restored");
        Ok(restored)
    }

    /// Live route for a request below the sandbox prefix
    #[must_use]
    pub fn dispatch(&self, id: SandboxId, method: HttpMethod, path: &str) -> Option<RouteMatch> {
        self.routes.dispatch(id, method, path)
    }

    /// Resolve a live mock request
    ///
    /// # Errors
    /// [`VapiError::NotFound`] when no live route matches.
    pub async fn handle(
        &self,
        id: SandboxId,
        method: HttpMethod,
        path: &str,
        request: MockRequest,
    ) -> VapiResult<ResolvedResponse> {
        let route = self
            .dispatch(id, method, path)
            .ok_or_else(|| VapiError::not_found(format!("route {method} {path}")))?;
        route.call(request).await
    }

    /// Run `work` holding the sandbox's lifecycle lock
    async fn exclusive<T, F>(&self, id: SandboxId, work: F) -> VapiResult<T>
    where
        F: Future<Output = VapiResult<T>>,
    {
        let lock = Arc::clone(self.lifecycle.entry(id).or_default().value());
        let guard = lock.lock().await;
        let output = work.await;
        drop(guard);
        drop(lock);
        self.lifecycle.remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        output
    }

    async fn clear_log(&self, id: SandboxId) {
        if let Err(e) = self.recorder.clear(id).await {
            tracing::warn!(sandbox = %id, error = %e, "request log not cleared");
        }
    }
}

fn parse_endpoint(raw: &str) -> VapiResult<EndpointKey> {
    raw.parse::<EndpointKey>()
        .map_err(|e| VapiError::validation(format!("endpoint '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use vapi_recorder::ResponseSource;
    use vapi_store::{KvSandboxRepository, SandboxRepository, StoreCache, StoreResult};

    fn doc() -> Value {
        json!({
            "openapi": "3.0.3",
            "info": {"title": "Accounts", "version": "1"},
            "paths": {
                "/accounts/{id}": {"get": {"responses": {"200": {"content": {"application/json": {
                    "schema": {"type": "object", "properties": {"id": {"type": "string"}}}
                }}}}}}
            }
        })
    }

    fn team() -> TenantContext {
        TenantContext::new("team-a").with_user("alice")
    }

    #[tokio::test]
    async fn create_with_document_goes_live() {
        let service = SandboxService::in_memory();
        let record = service.create(&team(), "accounts", Some(&doc())).await.unwrap();
        assert_eq!(record.state, SandboxState::Stopped);
        assert_eq!(record.version, 1);

        let resolved = service
            .handle(record.id, HttpMethod::Get, "/accounts/9", MockRequest::default())
            .await
            .unwrap();
        assert_eq!(resolved.body, json!({"id": "string"}));
    }

    #[tokio::test]
    async fn create_rejects_invalid_document() {
        let service = SandboxService::in_memory();
        let err = service
            .create(&team(), "bad", Some(&json!({"openapi": "3.0.0"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_spec");
        assert!(service.list(&team()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_team_sees_not_found() {
        let service = SandboxService::in_memory();
        let record = service.create(&team(), "accounts", None).await.unwrap();
        let intruder = TenantContext::new("team-b");
        let err = service.get(&intruder, record.id).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
        let err = service.delete(&intruder, record.id).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
        assert!(service.get(&team(), record.id).await.is_ok());
    }

    #[tokio::test]
    async fn upload_spec_reloads_routes() {
        let service = SandboxService::in_memory();
        let record = service.create(&team(), "accounts", None).await.unwrap();
        assert!(service.dispatch(record.id, HttpMethod::Get, "/accounts/1").is_none());

        let updated = service.upload_spec(&team(), record.id, &doc()).await.unwrap();
        assert_eq!(updated.version, 2);
        assert!(service.dispatch(record.id, HttpMethod::Get, "/accounts/1").is_some());
    }

    #[tokio::test]
    async fn invalid_upload_keeps_old_routes() {
        let service = SandboxService::in_memory();
        let record = service.create(&team(), "accounts", Some(&doc())).await.unwrap();
        let err = service
            .upload_spec(&team(), record.id, &json!({"openapi": "3.0.0", "info": {}}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_spec");
        assert!(service.dispatch(record.id, HttpMethod::Get, "/accounts/1").is_some());
    }

    #[tokio::test]
    async fn register_simulation_rejects_bad_endpoint() {
        let service = SandboxService::in_memory();
        let record = service.create(&team(), "accounts", None).await.unwrap();
        let err = service
            .register_simulation(&team(), record.id, "FETCH /x", SimulationConfig::plugin("balance"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
        let err = service
            .register_simulation(&team(), record.id, "GET /x", SimulationConfig::plugin("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[tokio::test]
    async fn reset_clears_state_and_log() {
        let service = SandboxService::in_memory();
        let record = service.create(&team(), "accounts", Some(&doc())).await.unwrap();
        service
            .register_simulation(
                &team(),
                record.id,
                "GET /accounts/{id}",
                SimulationConfig::plugin("balance").with_option("initial", json!(10)),
            )
            .await
            .unwrap();
        let debit = MockRequest::with_body(json!({"userId": "u", "amount": 4, "type": "debit"}));
        let first = service
            .handle(record.id, HttpMethod::Get, "/accounts/1", debit.clone())
            .await
            .unwrap();
        assert_eq!(first.body["balance"], json!(6));
        assert_eq!(service.requests(&team(), record.id, None).await.unwrap().len(), 1);

        let reset = service
            .update_state(&team(), record.id, SandboxState::Reset)
            .await
            .unwrap();
        assert_eq!(reset.state, SandboxState::Reset);
        assert!(service.requests(&team(), record.id, None).await.unwrap().is_empty());

        let again = service
            .handle(record.id, HttpMethod::Get, "/accounts/1", debit)
            .await
            .unwrap();
        assert_eq!(again.body["balance"], json!(6));
        assert_eq!(again.source, ResponseSource::Simulation);
    }

    #[tokio::test]
    async fn requests_are_newest_first() {
        let service = SandboxService::in_memory();
        let record = service.create(&team(), "accounts", Some(&doc())).await.unwrap();
        for n in 0..3 {
            service
                .handle(
                    record.id,
                    HttpMethod::Get,
                    &format!("/accounts/{n}"),
                    MockRequest::default(),
                )
                .await
                .unwrap();
        }
        let log = service.requests(&team(), record.id, Some(2)).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].request.params.get("id"), Some(&json!("2")));
        assert_eq!(log[1].request.params.get("id"), Some(&json!("1")));
    }

    #[tokio::test]
    async fn delete_takes_routes_down() {
        let service = SandboxService::in_memory();
        let record = service.create(&team(), "accounts", Some(&doc())).await.unwrap();
        service
            .save_mock(&team(), record.id, NewMock::new("GET", "/accounts/{id}", json!({"id": "x"})))
            .await
            .unwrap();
        service.delete(&team(), record.id).await.unwrap();

        let err = service
            .handle(record.id, HttpMethod::Get, "/accounts/1", MockRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
        assert!(service.get(&team(), record.id).await.is_err());
        assert!(service.store().list_mocks(record.id).await.unwrap().is_empty());
    }

    /// Sandbox records whose next write lands late
    #[derive(Debug)]
    struct LateWrites {
        inner: KvSandboxRepository,
        armed: AtomicBool,
    }

    #[async_trait]
    impl SandboxRepository for LateWrites {
        async fn get(&self, id: SandboxId) -> StoreResult<Option<SandboxRecord>> {
            self.inner.get(id).await
        }

        async fn put(&self, record: &SandboxRecord) -> StoreResult<()> {
            if self.armed.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            self.inner.put(record).await
        }

        async fn list(&self) -> StoreResult<Vec<SandboxRecord>> {
            self.inner.list().await
        }

        async fn delete(&self, id: SandboxId) -> StoreResult<()> {
            self.inner.delete(id).await
        }
    }

    fn doc_with(path: &str) -> Value {
        let mut document = doc();
        document["paths"] = json!({});
        document["paths"][path] = json!({"get": {"responses": {"204": {"description": "ok"}}}});
        document
    }

    #[tokio::test]
    async fn delete_during_upload_leaves_nothing_behind() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKv::new());
        let sandboxes = Arc::new(LateWrites {
            inner: KvSandboxRepository::new(Arc::clone(&kv)),
            armed: AtomicBool::new(false),
        });
        let store = SandboxStore::new(
            Arc::clone(&sandboxes) as Arc<dyn SandboxRepository>,
            Arc::new(vapi_store::KvMockRepository::new(Arc::clone(&kv))),
            StoreCache::new(100),
        );
        let service = SandboxService::new(
            store,
            Arc::new(SimulationEngine::with_kv(PluginRegistry::with_builtins(), kv)),
            Arc::new(MemoryRecorder::new(10)),
        );
        let record = service.create(&team(), "accounts", Some(&doc())).await.unwrap();

        sandboxes.armed.store(true, Ordering::SeqCst);
        let upload = tokio::spawn({
            let service = service.clone();
            async move { service.upload_spec(&team(), record.id, &doc_with("/b")).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let deleted = service.delete(&team(), record.id).await;

        assert!(upload.await.unwrap().is_ok());
        assert!(deleted.is_ok());
        assert!(service.dispatch(record.id, HttpMethod::Get, "/b").is_none());
        assert!(service.dispatch(record.id, HttpMethod::Get, "/accounts/1").is_none());
        assert!(service.store().get_sandbox(record.id).await.unwrap().is_none());
        assert!(service.lifecycle.is_empty());
    }

    #[tokio::test]
    async fn upload_after_delete_is_not_found() {
        let service = SandboxService::in_memory();
        let record = service.create(&team(), "accounts", Some(&doc())).await.unwrap();
        service.delete(&team(), record.id).await.unwrap();

        let err = service
            .upload_spec(&team(), record.id, &doc_with("/b"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
        assert!(service.dispatch(record.id, HttpMethod::Get, "/b").is_none());
        assert!(service.store().get_sandbox(record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_registers_stored_documents() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKv::new());
        let first = SandboxService::with_kv(Arc::clone(&kv), 100, 10);
        let with_doc = first.create(&team(), "a", Some(&doc())).await.unwrap();
        first.create(&team(), "b", None).await.unwrap();

        let second = SandboxService::with_kv(kv, 100, 10);
        assert!(second.dispatch(with_doc.id, HttpMethod::Get, "/accounts/1").is_none());
        assert_eq!(second.restore_routes().await.unwrap(), 1);
        assert!(second.dispatch(with_doc.id, HttpMethod::Get, "/accounts/1").is_some());
    }
}
