//! Fail-closed access check for tenant-scoped code.
//!
//! Every data-access path that filters by tenant goes through
//! [`AccessGuard::current_tenant`]. It only reads the already-bound scope:
//! no side effects, no I/O.

use crate::scope::{RequestScope, ScopeState};
use crate::types::TenantId;
use crate::violation::{AccessViolation, ViolationCause};

/// Stateless choke point in front of tenant-scoped data.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    /// Returns the tenant bound to `scope`.
    ///
    /// # Errors
    ///
    /// Returns an [`AccessViolation`] unless the scope is in the `Bound` state.
    /// A scope whose resolution failed reports the recorded cause.
    pub fn current_tenant(scope: &RequestScope) -> Result<TenantId, AccessViolation> {
        match scope.state() {
            ScopeState::Bound(id) => Ok(id),
            ScopeState::Unresolved => Err(ViolationCause::NoTenantBound.into()),
            ScopeState::Failed(cause) => Err(cause.into()),
            ScopeState::Cleared => Err(ViolationCause::ScopeEnded.into()),
        }
    }

    /// Runs `op` with the bound tenant id, or refuses without running it.
    ///
    /// # Errors
    ///
    /// Same as [`current_tenant`](Self::current_tenant).
    pub fn scoped<R>(
        scope: &RequestScope,
        op: impl FnOnce(&TenantId) -> R,
    ) -> Result<R, AccessViolation> {
        let id = Self::current_tenant(scope)?;
        Ok(op(&id))
    }
}
