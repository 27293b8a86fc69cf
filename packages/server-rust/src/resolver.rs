//! Per-request tenant resolution: matcher, then key validation, then directory.

use std::sync::Arc;

use companyscope_core::{KeyError, Tenant, TenantKey, ViolationCause};

use crate::config::ScopeConfig;
use crate::directory::{DirectoryError, TenantDirectory};
use crate::matchers::RequestMetadata;
use crate::traits::DomainMatcher;

/// Resolution failed for this request. Terminal; not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("tenant unresolved: {}", cause.as_str())]
pub struct Unresolved {
    pub cause: ViolationCause,
}

impl From<ViolationCause> for Unresolved {
    fn from(cause: ViolationCause) -> Self {
        Self { cause }
    }
}

/// Orchestrates one request's resolution.
#[derive(Clone)]
pub struct TenantResolver {
    matcher: Arc<dyn DomainMatcher>,
    directory: Arc<TenantDirectory>,
    bootstrap_mode: bool,
}

impl TenantResolver {
    #[must_use]
    pub fn new(
        matcher: Arc<dyn DomainMatcher>,
        directory: Arc<TenantDirectory>,
        config: &ScopeConfig,
    ) -> Self {
        Self {
            matcher,
            directory,
            bootstrap_mode: config.bootstrap_mode,
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Arc<TenantDirectory> {
        &self.directory
    }

    /// Resolves the tenant for `request`.
    ///
    /// In bootstrap mode a request with no valid candidate key (none, empty,
    /// or malformed) falls back to the `DEFAULT` tenant. A valid key that
    /// names no tenant is never rescued by the fallback. The reserved
    /// `DEFAULT` key itself only resolves in bootstrap mode.
    ///
    /// # Errors
    ///
    /// [`Unresolved`] carrying `NoCandidateKey`, `InvalidKeyFormat`,
    /// `TenantNotFound`, or `StoreUnavailable`.
    pub async fn resolve(&self, request: &RequestMetadata) -> Result<Tenant, Unresolved> {
        let key = match self.candidate_key(request) {
            Ok(key) => key,
            Err(cause) if self.bootstrap_mode => return self.resolve_bootstrap(cause).await,
            Err(cause) => return Err(cause.into()),
        };

        if key.is_default() && !self.bootstrap_mode {
            tracing::warn!(host = ?request.host, "reserved default key requested outside bootstrap mode");
            return Err(ViolationCause::TenantNotFound.into());
        }

        match self.directory.resolve(&key).await {
            Ok(tenant) => {
                tracing::debug!(key = %key, tenant_id = %tenant.id, "tenant resolved");
                Ok(tenant)
            }
            Err(DirectoryError::NotFound(key)) => {
                tracing::info!(key = %key, "no tenant matches key");
                Err(ViolationCause::TenantNotFound.into())
            }
            Err(DirectoryError::Store(err)) => {
                tracing::error!(key = %key, error = %err, "tenant store failure during resolution");
                Err(ViolationCause::StoreUnavailable.into())
            }
        }
    }

    fn candidate_key(&self, request: &RequestMetadata) -> Result<TenantKey, ViolationCause> {
        let Some(raw) = self.matcher.to_key(request) else {
            tracing::debug!(host = ?request.host, "no tenant candidate derivable from request");
            return Err(ViolationCause::NoCandidateKey);
        };

        TenantKey::parse(&raw).map_err(|err| {
            match &err {
                KeyError::Empty => {
                    tracing::warn!(host = ?request.host, "empty tenant key candidate");
                }
                KeyError::InvalidCharacter { .. } => {
                    tracing::warn!(candidate = %raw, error = %err, "invalid tenant key format");
                }
            }
            ViolationCause::InvalidKeyFormat
        })
    }

    async fn resolve_bootstrap(&self, original: ViolationCause) -> Result<Tenant, Unresolved> {
        match self.directory.resolve_default().await {
            Ok(tenant) => {
                tracing::debug!(tenant_id = %tenant.id, "bootstrap mode: using default tenant");
                Ok(tenant)
            }
            Err(DirectoryError::NotFound(_)) => {
                tracing::warn!("bootstrap mode enabled but no default tenant is available");
                Err(original.into())
            }
            Err(DirectoryError::Store(err)) => {
                tracing::error!(error = %err, "tenant store failure loading default tenant");
                Err(ViolationCause::StoreUnavailable.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use companyscope_core::TenantId;

    use super::*;
    use crate::matchers::SubdomainMatcher;
    use crate::store::InMemoryTenantStore;
    use crate::traits::TenantStore;

    struct Fixture {
        store: Arc<InMemoryTenantStore>,
        resolver: TenantResolver,
    }

    fn fixture(config: &ScopeConfig) -> Fixture {
        let store = Arc::new(InMemoryTenantStore::new());
        store.insert(TenantKey::parse("acme").unwrap(), 1);
        store.insert(TenantKey::default_key(), 100);
        let directory = Arc::new(TenantDirectory::new(
            Arc::clone(&store) as Arc<dyn TenantStore>,
            config,
        ));
        let resolver = TenantResolver::new(
            Arc::new(SubdomainMatcher::new().with_min_labels(2)),
            directory,
            config,
        );
        Fixture { store, resolver }
    }

    fn host(h: &str) -> RequestMetadata {
        RequestMetadata::for_host(h)
    }

    #[tokio::test]
    async fn resolves_known_subdomain() {
        let f = fixture(&ScopeConfig::default());
        let tenant = f.resolver.resolve(&host("acme.example.com")).await.unwrap();
        assert_eq!(tenant.id, TenantId::from(1));
    }

    #[tokio::test]
    async fn invalid_characters_fail_without_store_query() {
        let f = fixture(&ScopeConfig::default());
        let err = f.resolver.resolve(&host("acme!.example.com")).await.unwrap_err();
        assert_eq!(err.cause, ViolationCause::InvalidKeyFormat);
        assert_eq!(f.store.query_count(), 0);
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let f = fixture(&ScopeConfig::default());
        let err = f.resolver.resolve(&host("ghost.example.com")).await.unwrap_err();
        assert_eq!(err.cause, ViolationCause::TenantNotFound);
    }

    #[tokio::test]
    async fn missing_candidate_is_distinct_from_invalid() {
        let f = fixture(&ScopeConfig::default());
        let err = f.resolver.resolve(&RequestMetadata::default()).await.unwrap_err();
        assert_eq!(err.cause, ViolationCause::NoCandidateKey);
    }

    #[tokio::test]
    async fn store_outage_is_not_reported_as_not_found() {
        let f = fixture(&ScopeConfig::default());
        f.store.set_failing(true);
        let err = f.resolver.resolve(&host("acme.example.com")).await.unwrap_err();
        assert_eq!(err.cause, ViolationCause::StoreUnavailable);
    }

    #[tokio::test]
    async fn bootstrap_mode_falls_back_for_underivable_keys() {
        let config = ScopeConfig {
            bootstrap_mode: true,
            ..ScopeConfig::default()
        };
        let f = fixture(&config);

        let from_invalid = f.resolver.resolve(&host("acme!.example.com")).await.unwrap();
        assert_eq!(from_invalid.id, TenantId::from(100));

        let from_nothing = f.resolver.resolve(&RequestMetadata::default()).await.unwrap();
        assert_eq!(from_nothing.id, TenantId::from(100));
    }

    #[tokio::test]
    async fn bootstrap_mode_does_not_rescue_unknown_tenants() {
        let config = ScopeConfig {
            bootstrap_mode: true,
            ..ScopeConfig::default()
        };
        let f = fixture(&config);
        let err = f.resolver.resolve(&host("ghost.example.com")).await.unwrap_err();
        assert_eq!(err.cause, ViolationCause::TenantNotFound);
    }

    #[tokio::test]
    async fn default_subdomain_is_not_found_outside_bootstrap_mode() {
        let f = fixture(&ScopeConfig::default());
        let err = f.resolver.resolve(&host("default.example.com")).await.unwrap_err();
        assert_eq!(err.cause, ViolationCause::TenantNotFound);
        assert_eq!(f.store.query_count(), 0);
    }

    #[tokio::test]
    async fn default_subdomain_resolves_in_bootstrap_mode() {
        let config = ScopeConfig {
            bootstrap_mode: true,
            ..ScopeConfig::default()
        };
        let f = fixture(&config);
        let tenant = f.resolver.resolve(&host("default.example.com")).await.unwrap();
        assert_eq!(tenant.id, TenantId::from(100));
        assert_eq!(f.resolver.directory().stats().await.cached_keys, 0);
    }

    #[tokio::test]
    async fn bootstrap_without_default_keeps_original_cause() {
        let config = ScopeConfig {
            bootstrap_mode: true,
            ..ScopeConfig::default()
        };
        let f = fixture(&config);
        f.store.remove(&TenantKey::default_key());
        let err = f.resolver.resolve(&host("acme!.example.com")).await.unwrap_err();
        assert_eq!(err.cause, ViolationCause::InvalidKeyFormat);
    }
}
