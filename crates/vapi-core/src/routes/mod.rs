//! Live route table
//!
//! Every sandbox with a document owns one immutable [`RouteSet`]. The table
//! maps sandbox ids to `Arc<RouteSet>`; a reload builds the complete new set
//! first and swaps it in with a single map insert, so a request sees either
//! the old routes or the new ones and never an empty table in between.
//!
//! Routes live under [`route_prefix`]: `/sandbox/{id}/api` + declared path.

mod template;

pub use template::PathTemplate;

use crate::error::{ConflictError, VapiResult};
use crate::pipeline::{ResolutionPipeline, ResolvedResponse};
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use vapi_store::ValidatedSpec;
use vapi_types::{EndpointKey, HttpMethod, MockRequest, SandboxId};

/// Prefix of every live route of a sandbox
#[must_use]
pub fn route_prefix(sandbox: SandboxId) -> String {
    format!("/sandbox/{sandbox}/api")
}

/// One route derived from a document operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedRoute {
    /// `METHOD path` with the declared path
    pub endpoint: EndpointKey,
    /// Parsed declared path
    pub template: PathTemplate,
}

/// Derive the routes of a document, in declaration order
///
/// Operations whose method and normalized template collide are reported as
/// [`ConflictError`]s; the later operation replaces the earlier one in place.
#[must_use]
pub fn derive_routes(spec: &ValidatedSpec) -> (Vec<DerivedRoute>, Vec<ConflictError>) {
    let mut routes: Vec<DerivedRoute> = Vec::with_capacity(spec.operations().len());
    let mut index: HashMap<(HttpMethod, String), usize> = HashMap::new();
    let mut conflicts = Vec::new();

    for operation in spec.operations() {
        let template = PathTemplate::parse(&operation.path);
        let route = DerivedRoute {
            endpoint: operation.endpoint(),
            template,
        };
        let key = (operation.method, route.template.normalized());
        if let Some(&slot) = index.get(&key) {
            conflicts.push(ConflictError {
                method: operation.method,
                template: key.1,
                replaced: routes[slot].template.as_str().to_string(),
                kept: operation.path.clone(),
            });
            routes[slot] = route;
        } else {
            index.insert(key, routes.len());
            routes.push(route);
        }
    }
    (routes, conflicts)
}

/// Handler bound to one live route
pub type RouteHandler =
    Arc<dyn Fn(MockRequest) -> BoxFuture<'static, VapiResult<ResolvedResponse>> + Send + Sync>;

/// Live route: a derived route plus its handler
#[derive(Clone)]
pub struct Route {
    /// `METHOD path` with the declared path
    pub endpoint: EndpointKey,
    /// Parsed declared path
    pub template: PathTemplate,
    handler: RouteHandler,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("endpoint", &self.endpoint)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// Immutable routes of one sandbox
#[derive(Debug, Clone, Default)]
pub struct RouteSet {
    routes: Vec<Route>,
}

impl RouteSet {
    /// Number of routes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if there are no routes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Endpoint keys in declaration order
    #[must_use]
    pub fn endpoints(&self) -> Vec<EndpointKey> {
        self.routes.iter().map(|r| r.endpoint.clone()).collect()
    }

    /// Most specific route matching `method` and `path`
    ///
    /// The route with the most literal segments wins; ties go to the route
    /// declared first.
    #[must_use]
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<RouteMatch> {
        let mut best: Option<(&Route, Map<String, Value>)> = None;
        for route in self.routes.iter().filter(|r| r.endpoint.method() == method) {
            let Some(params) = route.template.matches(path) else {
                continue;
            };
            let better = best
                .as_ref()
                .map_or(true, |(current, _)| {
                    route.template.literal_count() > current.template.literal_count()
                });
            if better {
                best = Some((route, params));
            }
        }
        best.map(|(route, params)| RouteMatch {
            endpoint: route.endpoint.clone(),
            params,
            handler: Arc::clone(&route.handler),
        })
    }
}

/// Route selected for one request
#[derive(Clone)]
pub struct RouteMatch {
    /// Endpoint of the matched route
    pub endpoint: EndpointKey,
    /// Path parameters extracted from the request path
    pub params: Map<String, Value>,
    handler: RouteHandler,
}

impl RouteMatch {
    /// Run the route's handler with the extracted path parameters
    ///
    /// # Errors
    /// Whatever the resolution pipeline fails with.
    pub async fn call(self, mut request: MockRequest) -> VapiResult<ResolvedResponse> {
        request.params = self.params;
        (self.handler)(request).await
    }
}

impl std::fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("endpoint", &self.endpoint)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Per-sandbox live routes
#[derive(Debug)]
pub struct RouteTable {
    routes: DashMap<SandboxId, Arc<RouteSet>>,
    /// Serializes register/reload/unregister of one sandbox
    reload_locks: DashMap<SandboxId, Arc<Mutex<()>>>,
    pipeline: ResolutionPipeline,
}

impl RouteTable {
    /// Create empty table whose handlers delegate to `pipeline`
    #[must_use]
    pub fn new(pipeline: ResolutionPipeline) -> Self {
        Self {
            routes: DashMap::new(),
            reload_locks: DashMap::new(),
            pipeline,
        }
    }

    /// Install the routes of `spec`, replacing any existing ones
    pub async fn register_routes(&self, sandbox: SandboxId, spec: &ValidatedSpec) -> usize {
        let lock = self.lock_for(sandbox);
        let _guard = lock.lock().await;
        let count = self.install(sandbox, spec);
        tracing::info!(sandbox = %sandbox, routes = count, prefix = %route_prefix(sandbox), "routes registered");
        count
    }

    /// Atomically replace the routes of a sandbox with those of `spec`
    pub async fn reload_routes(&self, sandbox: SandboxId, spec: &ValidatedSpec) -> usize {
        let lock = self.lock_for(sandbox);
        let _guard = lock.lock().await;
        let count = self.install(sandbox, spec);
        tracing::info!(sandbox = %sandbox, routes = count, "routes reloaded");
        count
    }

    /// Remove every route of a sandbox; no-op when none are live
    pub async fn unregister_routes(&self, sandbox: SandboxId) -> usize {
        let removed = {
            let lock = self.lock_for(sandbox);
            let _guard = lock.lock().await;
            self.routes
                .remove(&sandbox)
                .map_or(0, |(_, set)| set.len())
        };
        self.reload_locks
            .remove_if(&sandbox, |_, lock| Arc::strong_count(lock) == 1);
        if removed > 0 {
            tracing::info!(sandbox = %sandbox, routes = removed, "routes unregistered");
        }
        removed
    }

    /// Find the live route for a request path below the sandbox prefix
    #[must_use]
    pub fn dispatch(&self, sandbox: SandboxId, method: HttpMethod, path: &str) -> Option<RouteMatch> {
        let set = self.routes.get(&sandbox).map(|entry| Arc::clone(entry.value()))?;
        set.find(method, path)
    }

    /// Live endpoints of a sandbox, in declaration order
    #[must_use]
    pub fn routes(&self, sandbox: SandboxId) -> Vec<EndpointKey> {
        self.routes
            .get(&sandbox)
            .map(|set| set.endpoints())
            .unwrap_or_default()
    }

    /// Check if a sandbox has live routes
    #[inline]
    #[must_use]
    pub fn is_registered(&self, sandbox: SandboxId) -> bool {
        self.routes.contains_key(&sandbox)
    }

    /// Number of sandboxes with live routes
    #[inline]
    #[must_use]
    pub fn sandbox_count(&self) -> usize {
        self.routes.len()
    }

    fn lock_for(&self, sandbox: SandboxId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.reload_locks
                .entry(sandbox)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Build the full route set, then swap it in with one insert
    fn install(&self, sandbox: SandboxId, spec: &ValidatedSpec) -> usize {
        let (derived, conflicts) = derive_routes(spec);
        for conflict in &conflicts {
            tracing::warn!(sandbox = %sandbox, error = %conflict, "route conflict");
        }
        let routes: Vec<Route> = derived
            .into_iter()
            .map(|route| Route {
                handler: self.handler(sandbox, route.endpoint.clone()),
                endpoint: route.endpoint,
                template: route.template,
            })
            .collect();
        let count = routes.len();
        self.routes.insert(sandbox, Arc::new(RouteSet { routes }));
        count
    }

    fn handler(&self, sandbox: SandboxId, endpoint: EndpointKey) -> RouteHandler {
        let pipeline = self.pipeline.clone();
        Arc::new(move |request: MockRequest| {
            let pipeline = pipeline.clone();
            let endpoint = endpoint.clone();
            async move { pipeline.resolve(sandbox, &endpoint, &request).await }.boxed()
        })
    }
}
