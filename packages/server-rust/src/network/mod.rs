//! HTTP boundary: the scoping middleware, the tenant extractor, and
//! violation rendering.

pub mod extract;
pub mod layer;
pub mod middleware;
pub mod violation;

pub use extract::CurrentTenant;
pub use layer::{TenantScopeLayer, TenantScopeService};
pub use middleware::build_http_layers;
pub use violation::{JsonViolationHandler, RedirectViolationHandler, ViolationRejection};
