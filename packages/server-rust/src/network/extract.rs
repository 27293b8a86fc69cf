//! Axum extractor for the bound tenant.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use companyscope_core::{AccessGuard, RequestScope, TenantId, ViolationCause};

use super::violation::ViolationRejection;

/// The tenant bound to the current request.
///
/// Extraction goes through [`AccessGuard`], so a handler taking this argument
/// never runs unscoped. Handlers that pass the scope further down (e.g. into
/// a repository) can extract `Extension<Arc<RequestScope>>` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentTenant(pub TenantId);

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = ViolationRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(scope) = parts.extensions.get::<Arc<RequestScope>>() else {
            tracing::error!("CurrentTenant extracted on a route without TenantScopeLayer");
            return Err(ViolationCause::NoTenantBound.into());
        };
        let id = AccessGuard::current_tenant(scope)?;
        Ok(Self(id))
    }
}
