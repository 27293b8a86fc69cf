//! Tenant keys: the normalized lookup identifier derived from a request.
//!
//! A raw candidate (typically a subdomain label) is accepted only when every
//! character is an ASCII letter or digit. Accepted candidates are uppercased,
//! so `"acme"`, `"Acme"` and `"ACME"` are the same key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key reserved for the bootstrap/default tenant.
pub const DEFAULT_TENANT_KEY: &str = "DEFAULT";

/// Reasons a raw candidate string cannot become a [`TenantKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("tenant key is empty")]
    Empty,
    #[error("tenant key contains disallowed character {ch:?} at position {position}")]
    InvalidCharacter { ch: char, position: usize },
}

/// Normalized, case-insensitive tenant key. Equality is the cache-lookup criterion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantKey(String);

impl TenantKey {
    /// Validates and canonicalizes a raw candidate.
    ///
    /// Surrounding ASCII whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Empty`] for an empty candidate and
    /// [`KeyError::InvalidCharacter`] for the first character outside `[A-Za-z0-9]`.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let trimmed = raw.trim_matches(|c: char| c.is_ascii_whitespace());
        if trimmed.is_empty() {
            return Err(KeyError::Empty);
        }
        if let Some((position, ch)) = trimmed
            .chars()
            .enumerate()
            .find(|(_, c)| !c.is_ascii_alphanumeric())
        {
            return Err(KeyError::InvalidCharacter { ch, position });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The reserved `DEFAULT` key.
    #[must_use]
    pub fn default_key() -> Self {
        Self(DEFAULT_TENANT_KEY.to_string())
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_TENANT_KEY
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TenantKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantKey {
    type Error = KeyError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<TenantKey> for String {
    fn from(key: TenantKey) -> Self {
        key.0
    }
}
