use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::TenantKey;

/// Opaque tenant identifier as issued by the authoritative store.
///
/// Numeric identifiers are stored in their decimal form, so `TenantId::from(1)`
/// and `TenantId::from("1")` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for TenantId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A resolved tenant record.
///
/// Owned by the authoritative store; the directory only caches copies.
/// Immutable once resolved within a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Identifier downstream data access filters by.
    pub id: TenantId,
    /// Key this tenant was resolved from.
    pub key: TenantKey,
}

impl Tenant {
    #[must_use]
    pub fn new(id: impl Into<TenantId>, key: TenantKey) -> Self {
        Self { id: id.into(), key }
    }
}
