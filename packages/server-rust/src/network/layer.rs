//! Tower middleware that wraps each request in its own tenant scope.
//!
//! Per request, [`TenantScopeService`]:
//! 1. creates a fresh `Arc<RequestScope>` and inserts it into the request extensions
//! 2. resolves the tenant through the [`TenantResolver`]
//! 3. binds it (or records the failure) and holds the guard inside the response future
//! 4. runs the inner service, then drops the guard, clearing the scope
//! 5. hands any [`AccessViolation`] to the configured [`ViolationHandler`]
//!
//! The guard is dropped on every exit path, including cancellation of the
//! response future (client disconnect, outer timeout).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{Method, Request};
use axum::response::Response;
use companyscope_core::{AccessViolation, OwnedScopeGuard, RequestScope, ViolationCause};
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use super::violation::JsonViolationHandler;
use crate::config::ScopeConfig;
use crate::matchers::RequestMetadata;
use crate::resolver::TenantResolver;
use crate::traits::ViolationHandler;

// ---------------------------------------------------------------------------
// TenantScopeLayer
// ---------------------------------------------------------------------------

/// Tower layer installing per-request tenant scoping.
#[derive(Clone)]
pub struct TenantScopeLayer {
    resolver: TenantResolver,
    handler: Arc<dyn ViolationHandler>,
    require_tenant: bool,
    skip_options: bool,
}

impl TenantScopeLayer {
    /// Creates the layer with the JSON violation handler.
    #[must_use]
    pub fn new(resolver: TenantResolver, config: &ScopeConfig) -> Self {
        Self {
            resolver,
            handler: Arc::new(JsonViolationHandler),
            require_tenant: config.require_tenant,
            skip_options: config.skip_options,
        }
    }

    #[must_use]
    pub fn with_violation_handler(mut self, handler: Arc<dyn ViolationHandler>) -> Self {
        self.handler = handler;
        self
    }
}

impl<S> Layer<S> for TenantScopeLayer {
    type Service = TenantScopeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TenantScopeService {
            inner,
            resolver: self.resolver.clone(),
            handler: Arc::clone(&self.handler),
            require_tenant: self.require_tenant,
            skip_options: self.skip_options,
        }
    }
}

// ---------------------------------------------------------------------------
// TenantScopeService
// ---------------------------------------------------------------------------

/// Service wrapper that resolves, binds and always clears the request scope.
#[derive(Clone)]
pub struct TenantScopeService<S> {
    inner: S,
    resolver: TenantResolver,
    handler: Arc<dyn ViolationHandler>,
    require_tenant: bool,
    skip_options: bool,
}

impl<S, B> Service<Request<B>> for TenantScopeService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let scope = Arc::new(RequestScope::new());
        req.extensions_mut().insert(Arc::clone(&scope));

        // Use the instance that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let handler = Arc::clone(&self.handler);

        if self.skip_options && req.method() == Method::OPTIONS {
            return Box::pin(async move {
                let _guard = OwnedScopeGuard::new(scope);
                let response = inner.call(req).await?;
                Ok(render_carried_violation(handler.as_ref(), response))
            });
        }

        let metadata = RequestMetadata::from_request(&req);
        let resolver = self.resolver.clone();
        let require_tenant = self.require_tenant;

        let span = info_span!(
            "tenant_scope",
            host = metadata.host.as_deref().unwrap_or(""),
            tenant_id = tracing::field::Empty,
            violation = tracing::field::Empty,
        );

        Box::pin(
            async move {
                let guard = match resolver.resolve(&metadata).await {
                    Ok(tenant) => {
                        tracing::Span::current().record("tenant_id", tracing::field::display(&tenant.id));
                        Arc::clone(&scope).bind_owned(&tenant)
                    }
                    Err(unresolved) => {
                        tracing::Span::current().record("violation", unresolved.cause.as_str());
                        if require_tenant {
                            scope.clear();
                            return Ok(handler.handle(&AccessViolation::new(unresolved.cause)));
                        }
                        Arc::clone(&scope).fail_owned(unresolved.cause)
                    }
                };

                // A fresh scope accepts its first transition; anything else
                // means the scope leaked into another request.
                let _guard = match guard {
                    Ok(guard) => guard,
                    Err(err) => {
                        tracing::error!(error = %err, "request scope was not fresh");
                        scope.clear();
                        return Ok(handler.handle(&AccessViolation::new(ViolationCause::NoTenantBound)));
                    }
                };

                let response = inner.call(req).await?;
                Ok(render_carried_violation(handler.as_ref(), response))
            }
            .instrument(span),
        )
    }
}

/// Hands a violation raised inside the inner service to `handler`.
fn render_carried_violation(handler: &dyn ViolationHandler, response: Response) -> Response {
    let Some(violation) = response.extensions().get::<AccessViolation>().copied() else {
        return response;
    };
    tracing::Span::current().record("violation", violation.cause.as_str());
    tracing::info!(cause = violation.cause.as_str(), "company access violation");
    handler.handle(&violation)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
