//! The single failure value that crosses into user-facing territory.

use serde::{Deserialize, Serialize};

/// Why a tenant-scoped operation was refused.
///
/// The first two causes come from the scope itself; the rest record why
/// resolution failed for the request, so a handler can tell an unknown
/// company apart from an infrastructure outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCause {
    /// Scoped code ran with no tenant ever bound (programming error or
    /// resolution was never attempted).
    NoTenantBound,
    /// Scoped code ran after the protected region ended.
    ScopeEnded,
    /// The matcher could not derive any candidate key from the request.
    NoCandidateKey,
    /// The candidate key contained characters outside the safe set.
    InvalidKeyFormat,
    /// The key is well formed but no tenant matches it.
    TenantNotFound,
    /// The authoritative store failed; transient, may be retried.
    StoreUnavailable,
}

impl ViolationCause {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoTenantBound => "no_tenant_bound",
            Self::ScopeEnded => "scope_ended",
            Self::NoCandidateKey => "no_candidate_key",
            Self::InvalidKeyFormat => "invalid_key_format",
            Self::TenantNotFound => "tenant_not_found",
            Self::StoreUnavailable => "store_unavailable",
        }
    }

    /// Whether retrying the same request could succeed.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }
}

/// A tenant-scoped operation was attempted without a bound tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("company access violation: {}", cause.as_str())]
pub struct AccessViolation {
    pub cause: ViolationCause,
}

impl AccessViolation {
    #[must_use]
    pub fn new(cause: ViolationCause) -> Self {
        Self { cause }
    }
}

impl From<ViolationCause> for AccessViolation {
    fn from(cause: ViolationCause) -> Self {
        Self::new(cause)
    }
}
