//! `CompanyScope` Server: tenant directory, per-request resolution, and the
//! tower/axum stage that binds a tenant for exactly one request.

pub mod config;
pub mod directory;
pub mod logging;
pub mod matchers;
pub mod network;
pub mod resolver;
pub mod store;
pub mod traits;

pub use config::ScopeConfig;
pub use directory::{DirectoryError, DirectoryStats, TenantDirectory};
pub use matchers::{FirstMatch, HeaderMatcher, RequestMetadata, SubdomainMatcher};
pub use network::{
    build_http_layers, CurrentTenant, JsonViolationHandler, RedirectViolationHandler,
    TenantScopeLayer, ViolationRejection,
};
pub use resolver::{TenantResolver, Unresolved};
pub use store::InMemoryTenantStore;
pub use traits::{DomainMatcher, StoreError, TenantStore, ViolationHandler};
