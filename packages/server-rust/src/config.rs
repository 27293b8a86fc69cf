use std::time::Duration;

/// Configuration for tenant resolution and request scoping.
#[derive(Debug, Clone)]
pub struct ScopeConfig {
    /// Fall back to the `DEFAULT` tenant when no valid key can be derived.
    /// Meant for bootstrap and test deployments only; never inferred from the
    /// environment name.
    pub bootstrap_mode: bool,
    /// Reject requests whose tenant cannot be resolved before the inner
    /// service runs. When `false` they proceed unbound and fail at the guard.
    pub require_tenant: bool,
    /// How long a found tenant stays cached. `None` keeps it until invalidated.
    pub positive_ttl: Option<Duration>,
    /// How long a not-found marker stays cached.
    pub negative_ttl: Option<Duration>,
    /// Upper bound on cached keys, found and not-found together.
    pub max_cached_keys: u64,
    /// Longest a single store query may take before it counts as a store
    /// failure. `None` waits indefinitely.
    pub store_timeout: Option<Duration>,
    /// Let CORS preflight (`OPTIONS`) requests through without resolution.
    pub skip_options: bool,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            bootstrap_mode: false,
            require_tenant: true,
            positive_ttl: Some(Duration::from_secs(300)),
            negative_ttl: Some(Duration::from_secs(30)),
            max_cached_keys: 10_000,
            store_timeout: Some(Duration::from_secs(5)),
            skip_options: true,
        }
    }
}
