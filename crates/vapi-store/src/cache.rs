//! Spec and mock cache using moka
//!
//! Read-through cache in front of the repositories. Writes go through to the
//! repository first and then replace the cache entry, so a read right after a
//! write always sees the written value.
//!
//! A load and a write of the same key never interleave: both run under that
//! key's lock, so a slow load cannot put an older value back over a newer
//! write.

use crate::model::MockDefinition;
use crate::openapi::ValidatedSpec;
use dashmap::DashMap;
use moka::future::Cache;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use vapi_types::{HttpMethod, SandboxId};

/// Default number of entries per cache
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Cache key of one mock
pub type MockKey = (SandboxId, HttpMethod, String);

/// Async locks keyed by cache key, dropped once nobody holds or awaits them
#[derive(Debug)]
struct KeyLocks<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyLocks<K> {
    fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    async fn run<F: Future>(&self, key: K, work: F) -> F::Output {
        let lock = Arc::clone(self.locks.entry(key.clone()).or_default().value());
        let out = {
            let _guard = lock.lock().await;
            work.await
        };
        drop(lock);
        self.locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        out
    }
}

/// Cache of validated specs and custom mocks
#[derive(Debug, Clone)]
pub struct StoreCache {
    specs: Cache<SandboxId, Arc<ValidatedSpec>>,
    mocks: Cache<MockKey, Arc<MockDefinition>>,
    spec_locks: Arc<KeyLocks<SandboxId>>,
    mock_locks: Arc<KeyLocks<MockKey>>,
}

impl StoreCache {
    /// Create new cache with max capacity per kind
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            specs: Cache::new(max_capacity),
            mocks: Cache::new(max_capacity),
            spec_locks: Arc::new(KeyLocks::new()),
            mock_locks: Arc::new(KeyLocks::new()),
        }
    }

    /// Cached spec
    #[inline]
    pub async fn spec(&self, sandbox: SandboxId) -> Option<Arc<ValidatedSpec>> {
        self.specs.get(&sandbox).await
    }

    /// Drop cached spec
    pub async fn invalidate_spec(&self, sandbox: SandboxId) {
        self.spec_locks
            .run(sandbox, self.specs.invalidate(&sandbox))
            .await;
    }

    /// Run a repository write, then cache what it wrote
    ///
    /// `write` yields its result plus the spec now current for `sandbox`;
    /// `None` drops the entry. No load of the same sandbox runs meanwhile.
    pub async fn write_spec<T, E, Fut>(&self, sandbox: SandboxId, write: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<(T, Option<ValidatedSpec>), E>>,
    {
        self.spec_locks
            .run(sandbox, async {
                let (out, current) = write.await?;
                match current {
                    Some(spec) => self.specs.insert(sandbox, Arc::new(spec)).await,
                    None => self.specs.invalidate(&sandbox).await,
                }
                Ok(out)
            })
            .await
    }

    /// Cached mock
    #[inline]
    pub async fn mock(&self, key: &MockKey) -> Option<Arc<MockDefinition>> {
        self.mocks.get(key).await
    }

    /// Drop cached mock
    pub async fn invalidate_mock(&self, key: &MockKey) {
        self.mock_locks
            .run(key.clone(), self.mocks.invalidate(key))
            .await;
    }

    /// Run a repository write, then cache what it wrote
    ///
    /// Same contract as [`write_spec`](Self::write_spec), for one mock key.
    pub async fn write_mock<T, E, Fut>(&self, key: MockKey, write: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<(T, Option<MockDefinition>), E>>,
    {
        self.mock_locks
            .run(key.clone(), async {
                let (out, current) = write.await?;
                match current {
                    Some(mock) => self.mocks.insert(key.clone(), Arc::new(mock)).await,
                    None => self.mocks.invalidate(&key).await,
                }
                Ok(out)
            })
            .await
    }

    /// Cached spec, or load it and cache a hit
    ///
    /// Misses (`Ok(None)`) are not cached.
    pub async fn try_spec_or_load<E, F, Fut>(
        &self,
        sandbox: SandboxId,
        load: F,
    ) -> Result<Option<Arc<ValidatedSpec>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<ValidatedSpec>, E>>,
    {
        if let Some(cached) = self.spec(sandbox).await {
            return Ok(Some(cached));
        }
        self.spec_locks
            .run(sandbox, async {
                if let Some(cached) = self.spec(sandbox).await {
                    return Ok(Some(cached));
                }
                let Some(loaded) = load().await? else {
                    return Ok(None);
                };
                let loaded = Arc::new(loaded);
                self.specs.insert(sandbox, Arc::clone(&loaded)).await;
                Ok(Some(loaded))
            })
            .await
    }

    /// Cached mock, or load it and cache a hit
    ///
    /// Misses (`Ok(None)`) are not cached.
    pub async fn try_mock_or_load<E, F, Fut>(
        &self,
        key: MockKey,
        load: F,
    ) -> Result<Option<Arc<MockDefinition>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<MockDefinition>, E>>,
    {
        if let Some(cached) = self.mock(&key).await {
            return Ok(Some(cached));
        }
        self.mock_locks
            .run(key.clone(), async {
                if let Some(cached) = self.mock(&key).await {
                    return Ok(Some(cached));
                }
                let Some(loaded) = load().await? else {
                    return Ok(None);
                };
                let loaded = Arc::new(loaded);
                self.mocks.insert(key.clone(), Arc::clone(&loaded)).await;
                Ok(Some(loaded))
            })
            .await
    }
}

impl Default for StoreCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
