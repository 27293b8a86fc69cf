//! Keyed, bounded cache in front of the authoritative tenant store.
//!
//! Lookups are cached per [`TenantKey`] in a `moka` future cache with a
//! capacity bound, so random subdomains cannot grow memory without limit.
//! Found and not-found results expire on separate TTLs. Concurrent misses for
//! the same key share one store query; a slow query for key A never delays a
//! lookup for key B. Store failures (including timeouts) are never cached.
//!
//! The reserved `DEFAULT` key never enters the keyed cache. It is served by
//! [`TenantDirectory::resolve_default`] from its own slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use companyscope_core::{Tenant, TenantKey};
use moka::future::Cache;
use moka::Expiry;

use crate::config::ScopeConfig;
use crate::traits::{StoreError, TenantStore};

/// Outcome of an authoritative lookup, as cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Tenant),
    NotFound,
}

/// Errors from [`TenantDirectory::resolve`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("no tenant for key {0}")]
    NotFound(TenantKey),
    /// Shared with every request that was waiting on the same query.
    #[error(transparent)]
    Store(Arc<StoreError>),
}

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        Self::Store(Arc::new(err))
    }
}

/// Point-in-time counters for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    pub hits: u64,
    pub misses: u64,
    pub store_queries: u64,
    pub cached_keys: u64,
}

/// Per-entry lifetime: found and not-found results age differently.
struct LookupExpiry {
    found: Option<Duration>,
    not_found: Option<Duration>,
}

impl Expiry<TenantKey, Lookup> for LookupExpiry {
    fn expire_after_create(
        &self,
        _key: &TenantKey,
        value: &Lookup,
        _created_at: Instant,
    ) -> Option<Duration> {
        match value {
            Lookup::Found(_) => self.found,
            Lookup::NotFound => self.not_found,
        }
    }
}

/// Resolves tenant keys to tenants, caching by key.
pub struct TenantDirectory {
    store: Arc<dyn TenantStore>,
    cache: Cache<TenantKey, Lookup>,
    default_tenant: ArcSwapOption<Tenant>,
    store_timeout: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
    store_queries: AtomicU64,
}

impl TenantDirectory {
    #[must_use]
    pub fn new(store: Arc<dyn TenantStore>, config: &ScopeConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_cached_keys)
            .expire_after(LookupExpiry {
                found: config.positive_ttl,
                not_found: config.negative_ttl,
            })
            .build();

        Self {
            store,
            cache,
            default_tenant: ArcSwapOption::empty(),
            store_timeout: config.store_timeout,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            store_queries: AtomicU64::new(0),
        }
    }

    /// Resolves `key`, consulting the store only on a miss or expired entry.
    ///
    /// The reserved `DEFAULT` key is delegated to
    /// [`resolve_default`](Self::resolve_default).
    ///
    /// # Errors
    ///
    /// [`DirectoryError::NotFound`] when the store has no tenant for `key`
    /// (possibly served from cache), [`DirectoryError::Store`] when the store
    /// query itself failed or timed out.
    pub async fn resolve(&self, key: &TenantKey) -> Result<Tenant, DirectoryError> {
        if key.is_default() {
            return self.resolve_default().await;
        }

        let entry = self
            .cache
            .entry_by_ref(key)
            .or_try_insert_with(self.fill(key))
            .await
            .map_err(DirectoryError::Store)?;

        if !entry.is_fresh() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("companyscope_directory_hits_total").increment(1);
            tracing::trace!(key = %key, "tenant cache hit");
        }
        lookup_result(key, entry.value())
    }

    /// Resolves the reserved `DEFAULT` tenant for bootstrap/test deployments.
    ///
    /// Bypasses the keyed cache: once found, the default tenant is held until
    /// [`clear`](Self::clear). Not consulted at all while the store reports
    /// itself unavailable.
    ///
    /// # Errors
    ///
    /// [`DirectoryError::NotFound`] when the store is unprovisioned or has no
    /// `DEFAULT` tenant, [`DirectoryError::Store`] when the query failed.
    pub async fn resolve_default(&self) -> Result<Tenant, DirectoryError> {
        if let Some(tenant) = self.default_tenant.load_full() {
            return Ok((*tenant).clone());
        }

        let key = TenantKey::default_key();
        if !self.store.is_available().await {
            tracing::debug!("tenant store not provisioned, default tenant unavailable");
            return Err(DirectoryError::NotFound(key));
        }

        match self.query_store(&key).await? {
            Lookup::Found(tenant) => {
                self.default_tenant.store(Some(Arc::new(tenant.clone())));
                Ok(tenant)
            }
            Lookup::NotFound => Err(DirectoryError::NotFound(key)),
        }
    }

    /// Preloads the default tenant at startup. Returns whether it was found.
    pub async fn warm_default(&self) -> bool {
        match self.resolve_default().await {
            Ok(tenant) => {
                tracing::info!(tenant_id = %tenant.id, "default tenant loaded");
                true
            }
            Err(err) => {
                tracing::info!(error = %err, "default tenant not loaded");
                false
            }
        }
    }

    /// Drops the cached entry for `key`. Returns whether one existed.
    pub async fn invalidate(&self, key: &TenantKey) -> bool {
        self.cache.remove(key).await.is_some()
    }

    /// Drops every cached entry, including the default tenant.
    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.default_tenant.store(None);
    }

    /// Runs pending cache maintenance: expired entries and entries over
    /// capacity are evicted. The cache also does this on its own as it is
    /// used; calling it just makes eviction prompt.
    pub async fn purge_expired(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Counters plus the number of cached keys after pending maintenance.
    pub async fn stats(&self) -> DirectoryStats {
        self.cache.run_pending_tasks().await;
        DirectoryStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            store_queries: self.store_queries.load(Ordering::Relaxed),
            cached_keys: self.cache.entry_count(),
        }
    }

    async fn fill(&self, key: &TenantKey) -> Result<Lookup, StoreError> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("companyscope_directory_misses_total").increment(1);
        self.query_store(key).await
    }

    async fn query_store(&self, key: &TenantKey) -> Result<Lookup, StoreError> {
        self.store_queries.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("companyscope_directory_store_queries_total").increment(1);

        let query = self.store.find_by_key(key);
        let found = match self.store_timeout {
            Some(limit) => tokio::time::timeout(limit, query)
                .await
                .unwrap_or(Err(StoreError::Timeout)),
            None => query.await,
        };
        let found = found.inspect_err(|err| {
            tracing::error!(key = %key, error = %err, "tenant store query failed");
        })?;

        Ok(match found {
            Some(tenant) if tenant.key == *key => Lookup::Found(tenant),
            Some(tenant) => {
                tracing::error!(
                    key = %key,
                    returned_key = %tenant.key,
                    tenant_id = %tenant.id,
                    "tenant store returned a record for a different key"
                );
                Lookup::NotFound
            }
            None => Lookup::NotFound,
        })
    }
}

fn lookup_result(key: &TenantKey, lookup: &Lookup) -> Result<Tenant, DirectoryError> {
    match lookup {
        Lookup::Found(tenant) => Ok(tenant.clone()),
        Lookup::NotFound => Err(DirectoryError::NotFound(key.clone())),
    }
}
