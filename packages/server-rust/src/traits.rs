use async_trait::async_trait;
use axum::response::Response;
use companyscope_core::{AccessViolation, Tenant, TenantKey};

use crate::matchers::RequestMetadata;

/// Failure talking to the authoritative tenant store.
///
/// Kept apart from "tenant not found" so an outage never looks like a
/// tenant-configuration problem.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("tenant store timed out")]
    Timeout,
    #[error("tenant store unavailable: {0}")]
    Unavailable(String),
    #[error("tenant store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Authoritative source of tenant records, supplied by the integrator.
/// Implementations: SQL table, config file, memory (tests).
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Look up the tenant for a normalized key. `Ok(None)` means the key is
    /// well formed but no tenant has it.
    async fn find_by_key(&self, key: &TenantKey) -> Result<Option<Tenant>, StoreError>;

    /// Whether the store is reachable and provisioned (e.g. the tenant table
    /// exists). Checked before loading the bootstrap tenant.
    async fn is_available(&self) -> bool {
        true
    }
}

/// Maps request metadata to a raw candidate tenant key.
///
/// `None` means nothing could be derived; `Some("")` is an empty candidate,
/// which the resolver treats as an invalid key.
pub trait DomainMatcher: Send + Sync {
    fn to_key(&self, request: &RequestMetadata) -> Option<String>;
}

/// Turns an [`AccessViolation`] into the response the user sees.
pub trait ViolationHandler: Send + Sync {
    fn handle(&self, violation: &AccessViolation) -> Response;
}
