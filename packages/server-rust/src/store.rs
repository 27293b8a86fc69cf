//! In-memory [`TenantStore`] backed by [`DashMap`].
//!
//! Suitable for development, tests and small fixed deployments where the
//! tenant list is known at startup. Counts queries and can simulate outages
//! and latency, which the directory tests rely on.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use companyscope_core::{Tenant, TenantId, TenantKey};
use dashmap::DashMap;

use crate::traits::{StoreError, TenantStore};

/// Concurrent in-memory tenant table.
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    tenants: DashMap<TenantKey, Tenant>,
    queries: AtomicU64,
    failing: AtomicBool,
    unavailable: AtomicBool,
    latency: Option<Duration>,
}

impl InMemoryTenantStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a simulated round-trip delay to every lookup.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Inserts or replaces the tenant for `key`.
    pub fn insert(&self, key: TenantKey, id: impl Into<TenantId>) -> Option<Tenant> {
        let tenant = Tenant::new(id, key.clone());
        self.tenants.insert(key, tenant)
    }

    pub fn remove(&self, key: &TenantKey) -> Option<Tenant> {
        self.tenants.remove(key).map(|(_, t)| t)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    /// Number of `find_by_key` calls served so far, including failed ones.
    #[must_use]
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    /// Makes every lookup fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Controls what [`TenantStore::is_available`] reports.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn find_by_key(&self, key: &TenantKey) -> Result<Option<Tenant>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(self.tenants.get(key).map(|t| t.value().clone()))
    }

    async fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> TenantKey {
        TenantKey::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn finds_inserted_tenant() {
        let store = InMemoryTenantStore::new();
        store.insert(key("acme"), 1);
        let found = store.find_by_key(&key("ACME")).await.unwrap().unwrap();
        assert_eq!(found.id, TenantId::from(1));
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = InMemoryTenantStore::new();
        assert!(store.find_by_key(&key("ghost")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failing_store_reports_error() {
        let store = InMemoryTenantStore::new();
        store.insert(key("acme"), 1);
        store.set_failing(true);
        let err = store.find_by_key(&key("acme")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn availability_toggle() {
        let store = InMemoryTenantStore::new();
        assert!(store.is_available().await);
        store.set_available(false);
        assert!(!store.is_available().await);
    }

    #[test]
    fn insert_replaces_and_remove_deletes() {
        let store = InMemoryTenantStore::new();
        assert!(store.insert(key("acme"), 1).is_none());
        let previous = store.insert(key("acme"), 2).unwrap();
        assert_eq!(previous.id, TenantId::from(1));
        assert_eq!(store.len(), 1);
        store.remove(&key("acme"));
        assert!(store.is_empty());
    }
}
