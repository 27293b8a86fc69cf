//! Per-request tenant binding with guaranteed release.
//!
//! A [`RequestScope`] is created empty for each request and never shared with
//! another request. Binding returns a guard; dropping the guard clears the
//! scope, so the binding cannot outlive the protected region on any exit path
//! (normal return, `?` propagation, panic unwind, or a dropped future).
//!
//! State machine:
//!
//! ```text
//! Unresolved --bind--------------> Bound(id) --guard drop--> Cleared
//! Unresolved --record_failure----> Failed(cause) --close---> Cleared
//! ```
//!
//! There is no transition back to `Unresolved`.

use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{Tenant, TenantId};
use crate::violation::ViolationCause;

/// Lifecycle state of a [`RequestScope`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScopeState {
    /// Request processing started; nothing resolved yet.
    #[default]
    Unresolved,
    /// A tenant is bound; scoped operations may proceed.
    Bound(TenantId),
    /// Resolution failed; the cause is kept for downstream diagnostics.
    Failed(ViolationCause),
    /// The protected region ended.
    Cleared,
}

/// Errors from illegal scope transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("request scope already has tenant {0} bound")]
    AlreadyBound(TenantId),
    #[error("request scope is closed")]
    Closed,
}

/// Per-request container holding at most one bound [`TenantId`].
#[derive(Debug, Default)]
pub struct RequestScope {
    state: RwLock<ScopeState>,
}

impl RequestScope {
    /// Creates an empty scope in the `Unresolved` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> ScopeState {
        self.state.read().clone()
    }

    /// Returns the bound tenant id, if any.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        match &*self.state.read() {
            ScopeState::Bound(id) => Some(id.clone()),
            _ => None,
        }
    }

    /// Binds `tenant` for as long as the returned guard lives.
    ///
    /// # Errors
    ///
    /// [`ScopeError::AlreadyBound`] if a tenant is already bound,
    /// [`ScopeError::Closed`] if resolution failed or the scope was cleared.
    pub fn bind(&self, tenant: &Tenant) -> Result<BindGuard<'_>, ScopeError> {
        self.transition(ScopeState::Bound(tenant.id.clone()))?;
        tracing::trace!(tenant_id = %tenant.id, key = %tenant.key, "tenant bound to request scope");
        Ok(BindGuard { scope: self })
    }

    /// Like [`bind`](Self::bind) but the guard owns a handle to the scope, so it
    /// can be moved into a `'static` future.
    ///
    /// # Errors
    ///
    /// Same as [`bind`](Self::bind).
    pub fn bind_owned(self: Arc<Self>, tenant: &Tenant) -> Result<OwnedScopeGuard, ScopeError> {
        self.transition(ScopeState::Bound(tenant.id.clone()))?;
        tracing::trace!(tenant_id = %tenant.id, key = %tenant.key, "tenant bound to request scope");
        Ok(OwnedScopeGuard { scope: self })
    }

    /// Records that resolution failed. Nothing is bound; every guard check
    /// reports `cause` until the scope is cleared.
    ///
    /// # Errors
    ///
    /// Same as [`bind`](Self::bind).
    pub fn record_failure(&self, cause: ViolationCause) -> Result<(), ScopeError> {
        self.transition(ScopeState::Failed(cause))
    }

    /// Records a failure and returns a guard that clears the scope on drop.
    ///
    /// # Errors
    ///
    /// Same as [`bind`](Self::bind).
    pub fn fail_owned(self: Arc<Self>, cause: ViolationCause) -> Result<OwnedScopeGuard, ScopeError> {
        self.record_failure(cause)?;
        Ok(OwnedScopeGuard { scope: self })
    }

    /// Ends the scope unconditionally. Idempotent.
    pub fn clear(&self) {
        *self.state.write() = ScopeState::Cleared;
    }

    fn transition(&self, next: ScopeState) -> Result<(), ScopeError> {
        let mut state = self.state.write();
        match &*state {
            ScopeState::Unresolved => {
                *state = next;
                Ok(())
            }
            ScopeState::Bound(id) => Err(ScopeError::AlreadyBound(id.clone())),
            ScopeState::Failed(_) | ScopeState::Cleared => Err(ScopeError::Closed),
        }
    }
}

/// Clears the borrowed scope when dropped.
#[derive(Debug)]
#[must_use = "the tenant is unbound as soon as the guard is dropped"]
pub struct BindGuard<'a> {
    scope: &'a RequestScope,
}

impl Drop for BindGuard<'_> {
    fn drop(&mut self) {
        self.scope.clear();
        tracing::trace!("request scope cleared");
    }
}

/// Clears the owned scope when dropped, including when the future holding it
/// is cancelled.
#[derive(Debug)]
#[must_use = "the scope is cleared as soon as the guard is dropped"]
pub struct OwnedScopeGuard {
    scope: Arc<RequestScope>,
}

impl OwnedScopeGuard {
    /// Guards `scope` in whatever state it is in; it is cleared on drop.
    pub fn new(scope: Arc<RequestScope>) -> Self {
        Self { scope }
    }

    #[must_use]
    pub fn scope(&self) -> &Arc<RequestScope> {
        &self.scope
    }
}

impl Drop for OwnedScopeGuard {
    fn drop(&mut self) {
        self.scope.clear();
        tracing::trace!("request scope cleared");
    }
}

/// Runs `body` with `tenant` bound to `scope`, clearing the scope afterwards.
///
/// # Errors
///
/// Returns a [`ScopeError`] without running `body` if the scope cannot be bound.
pub fn with_scope<R>(
    scope: &RequestScope,
    tenant: &Tenant,
    body: impl FnOnce() -> R,
) -> Result<R, ScopeError> {
    let _guard = scope.bind(tenant)?;
    Ok(body())
}

/// Async form of [`with_scope`].
///
/// The tenant is bound when this is called, not when the future is first
/// polled, so `tenant` only needs to live for the call. The guard moves into
/// the returned future: dropping it before completion still clears the scope.
///
/// # Errors
///
/// The future resolves to a [`ScopeError`] without polling `body` if the
/// scope cannot be bound.
pub fn with_scope_async<'a, F>(
    scope: &'a RequestScope,
    tenant: &Tenant,
    body: F,
) -> impl Future<Output = Result<F::Output, ScopeError>> + 'a
where
    F: Future + 'a,
{
    let bound = scope.bind(tenant);
    async move {
        let _guard = bound?;
        Ok(body.await)
    }
}
