//! HTTP middleware stack for a tenant-scoped application.
//!
//! Middleware ordering follows the outer-to-inner convention: the first
//! layer listed is the outermost (processes the request first on the way
//! in, and the response last on the way out).

use axum::http::header::HeaderName;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::layer::TenantScopeLayer;

/// The composed Tower layer type produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    TenantScopeLayer,
    tower::layer::util::Stack<
        PropagateRequestIdLayer,
        tower::layer::util::Stack<
            TraceLayer<
                tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
            >,
            tower::layer::util::Stack<
                SetRequestIdLayer<MakeRequestUuid>,
                tower::layer::util::Identity,
            >,
        >,
    >,
>;

/// Builds the HTTP middleware stack around tenant scoping.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns a UUID v4 `X-Request-Id` to every incoming request
/// 2. `Tracing` -- request/response spans, so tenant spans nest under the request
/// 3. `PropagateRequestId` -- copies `X-Request-Id` from the request to the response
/// 4. `TenantScope` -- resolves, binds and clears the tenant for the handler
#[must_use]
pub fn build_http_layers(scope: TenantScopeLayer) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .layer(scope)
        .into_inner()
}
