//! Stock [`ViolationHandler`]s and the response-side carrier for violations.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use companyscope_core::{AccessViolation, ViolationCause};
use serde_json::json;

use crate::traits::ViolationHandler;

/// Handler-facing error wrapping an [`AccessViolation`].
///
/// Its response carries the violation in the response extensions, where
/// [`TenantScopeService`](super::TenantScopeService) picks it up and hands it
/// to the configured [`ViolationHandler`]. Without that layer the JSON
/// rendering is what the client sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error(transparent)]
pub struct ViolationRejection(pub AccessViolation);

impl From<AccessViolation> for ViolationRejection {
    fn from(violation: AccessViolation) -> Self {
        Self(violation)
    }
}

impl From<ViolationCause> for ViolationRejection {
    fn from(cause: ViolationCause) -> Self {
        Self(AccessViolation::new(cause))
    }
}

impl IntoResponse for ViolationRejection {
    fn into_response(self) -> Response {
        let mut response = JsonViolationHandler.handle(&self.0);
        response.extensions_mut().insert(self.0);
        response
    }
}

/// Redirects to a fixed "unknown company" page.
///
/// Store outages get a `503` instead, so they are not mistaken for a
/// company that does not exist.
#[derive(Debug, Clone)]
pub struct RedirectViolationHandler {
    location: String,
}

impl RedirectViolationHandler {
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

impl Default for RedirectViolationHandler {
    fn default() -> Self {
        Self::new("/wrong_company")
    }
}

impl ViolationHandler for RedirectViolationHandler {
    fn handle(&self, violation: &AccessViolation) -> Response {
        if violation.cause.is_transient() {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, "5")],
                "company directory temporarily unavailable",
            )
                .into_response();
        }
        Redirect::to(&self.location).into_response()
    }
}

/// Renders `{"error": "company_access_violation", "cause": ...}`.
///
/// `503` for transient causes, `404` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonViolationHandler;

impl ViolationHandler for JsonViolationHandler {
    fn handle(&self, violation: &AccessViolation) -> Response {
        let status = if violation.cause.is_transient() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::NOT_FOUND
        };
        let body = json!({
            "error": "company_access_violation",
            "cause": violation.cause.as_str(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(cause: ViolationCause) -> AccessViolation {
        AccessViolation::new(cause)
    }

    #[test]
    fn redirect_handler_points_at_configured_page() {
        let handler = RedirectViolationHandler::new("/no_such_company");
        let response = handler.handle(&violation(ViolationCause::TenantNotFound));
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/no_such_company");
    }

    #[test]
    fn redirect_handler_reports_outage_separately() {
        let handler = RedirectViolationHandler::default();
        let response = handler.handle(&violation(ViolationCause::StoreUnavailable));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[test]
    fn json_handler_status_by_cause() {
        let handler = JsonViolationHandler;
        assert_eq!(
            handler.handle(&violation(ViolationCause::InvalidKeyFormat)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            handler.handle(&violation(ViolationCause::StoreUnavailable)).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn json_handler_body_names_cause() {
        let response = JsonViolationHandler.handle(&violation(ViolationCause::NoTenantBound));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "company_access_violation");
        assert_eq!(body["cause"], "no_tenant_bound");
    }

    #[test]
    fn rejection_response_carries_violation() {
        let response = ViolationRejection::from(ViolationCause::ScopeEnded).into_response();
        let carried = response.extensions().get::<AccessViolation>().copied();
        assert_eq!(carried, Some(violation(ViolationCause::ScopeEnded)));
    }
}
