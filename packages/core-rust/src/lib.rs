//! `CompanyScope` Core: tenant keys, request scopes, and the fail-closed access guard.
//!
//! Everything here is synchronous and free of I/O. The async resolution side
//! (directory, resolver, middleware) lives in `companyscope-server`.

pub mod guard;
pub mod key;
pub mod scope;
pub mod types;
pub mod violation;

pub use guard::AccessGuard;
pub use key::{KeyError, TenantKey, DEFAULT_TENANT_KEY};
pub use scope::{
    with_scope, with_scope_async, BindGuard, OwnedScopeGuard, RequestScope, ScopeError,
    ScopeState,
};
pub use types::{Tenant, TenantId};
pub use violation::{AccessViolation, ViolationCause};
