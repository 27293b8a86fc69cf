//! Stock [`DomainMatcher`] implementations and the request metadata they read.

use std::net::IpAddr;

use http::header::{HeaderName, HOST};
use http::request::Parts;
use http::{HeaderMap, Request, Uri};

use crate::traits::DomainMatcher;

/// The slice of an inbound request a matcher may inspect.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    /// Host without port, from the `Host` header or the URI authority.
    pub host: Option<String>,
    pub path: String,
    pub headers: HeaderMap,
}

impl RequestMetadata {
    #[must_use]
    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self::from_head(req.uri(), req.headers())
    }

    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        Self::from_head(&parts.uri, &parts.headers)
    }

    fn from_head(uri: &Uri, headers: &HeaderMap) -> Self {
        let header_host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(strip_port);
        let host = header_host
            .or_else(|| uri.host().map(strip_port))
            .filter(|h| !h.is_empty());

        Self {
            host,
            path: uri.path().to_string(),
            headers: headers.clone(),
        }
    }

    /// Metadata for a bare host, mostly for tests and tooling.
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        Self {
            host: Some(strip_port(host)),
            path: "/".to_string(),
            headers: HeaderMap::new(),
        }
    }
}

fn strip_port(host: &str) -> String {
    let host = host.trim();
    if let Some(rest) = host.strip_prefix('[') {
        // Bracketed IPv6 literal, e.g. "[::1]:8080".
        return rest.split(']').next().unwrap_or_default().to_string();
    }
    host.split(':').next().unwrap_or_default().to_string()
}

/// Uses the first DNS label of the host: `acme.example.com` -> `acme`.
///
/// Hosts with fewer than `min_labels` labels and IP literals yield `None`,
/// so the apex domain and direct-IP access never name a tenant.
#[derive(Debug, Clone)]
pub struct SubdomainMatcher {
    min_labels: usize,
}

impl SubdomainMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self { min_labels: 3 }
    }

    #[must_use]
    pub fn with_min_labels(mut self, min_labels: usize) -> Self {
        self.min_labels = min_labels.max(1);
        self
    }
}

impl Default for SubdomainMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainMatcher for SubdomainMatcher {
    fn to_key(&self, request: &RequestMetadata) -> Option<String> {
        let host = request.host.as_deref()?;
        if host.parse::<IpAddr>().is_ok() {
            return None;
        }
        let host = host.trim_end_matches('.');
        if host.split('.').count() < self.min_labels {
            return None;
        }
        host.split('.').next().map(str::to_string)
    }
}

/// Reads the candidate from a request header (default `X-Company`).
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    header: HeaderName,
}

impl HeaderMatcher {
    #[must_use]
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

impl Default for HeaderMatcher {
    fn default() -> Self {
        Self::new(HeaderName::from_static("x-company"))
    }
}

impl DomainMatcher for HeaderMatcher {
    fn to_key(&self, request: &RequestMetadata) -> Option<String> {
        request
            .headers
            .get(&self.header)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    }
}

/// Tries each matcher in order; the first one that yields a candidate wins.
pub struct FirstMatch {
    matchers: Vec<Box<dyn DomainMatcher>>,
}

impl FirstMatch {
    #[must_use]
    pub fn new(matchers: Vec<Box<dyn DomainMatcher>>) -> Self {
        Self { matchers }
    }
}

impl DomainMatcher for FirstMatch {
    fn to_key(&self, request: &RequestMetadata) -> Option<String> {
        self.matchers.iter().find_map(|m| m.to_key(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(host: &str) -> Request<()> {
        Request::builder()
            .uri("/orders?page=2")
            .header(HOST, host)
            .body(())
            .unwrap()
    }

    #[test]
    fn metadata_strips_port_from_host_header() {
        let meta = RequestMetadata::from_request(&request("acme.example.com:8080"));
        assert_eq!(meta.host.as_deref(), Some("acme.example.com"));
        assert_eq!(meta.path, "/orders");
    }

    #[test]
    fn metadata_falls_back_to_uri_authority() {
        let req = Request::builder()
            .uri("http://globex.example.com/x")
            .body(())
            .unwrap();
        let meta = RequestMetadata::from_request(&req);
        assert_eq!(meta.host.as_deref(), Some("globex.example.com"));
    }

    #[test]
    fn metadata_from_parts_matches_request() {
        let (parts, ()) = request("initech.example.com").into_parts();
        let meta = RequestMetadata::from_parts(&parts);
        assert_eq!(meta.host.as_deref(), Some("initech.example.com"));
        assert_eq!(meta.path, "/orders");
    }

    #[test]
    fn metadata_handles_ipv6_literal() {
        let meta = RequestMetadata::from_request(&request("[::1]:3000"));
        assert_eq!(meta.host.as_deref(), Some("::1"));
    }

    #[test]
    fn subdomain_matcher_takes_first_label() {
        let matcher = SubdomainMatcher::new();
        let key = matcher.to_key(&RequestMetadata::for_host("acme.example.com"));
        assert_eq!(key.as_deref(), Some("acme"));
    }

    #[test]
    fn subdomain_matcher_ignores_apex_and_ip() {
        let matcher = SubdomainMatcher::new();
        assert!(matcher.to_key(&RequestMetadata::for_host("example.com")).is_none());
        assert!(matcher.to_key(&RequestMetadata::for_host("127.0.0.1")).is_none());
        assert!(matcher.to_key(&RequestMetadata::default()).is_none());
    }

    #[test]
    fn subdomain_matcher_passes_raw_label_through() {
        // Validation is the resolver's job; the matcher only extracts.
        let matcher = SubdomainMatcher::new().with_min_labels(2);
        let key = matcher.to_key(&RequestMetadata::for_host("acme!.localhost"));
        assert_eq!(key.as_deref(), Some("acme!"));
    }

    #[test]
    fn header_matcher_reads_configured_header() {
        let req = Request::builder()
            .header("x-company", "Initech")
            .body(())
            .unwrap();
        let meta = RequestMetadata::from_request(&req);
        assert_eq!(HeaderMatcher::default().to_key(&meta).as_deref(), Some("Initech"));
    }

    #[test]
    fn first_match_prefers_earlier_matchers() {
        let chain = FirstMatch::new(vec![
            Box::new(HeaderMatcher::default()),
            Box::new(SubdomainMatcher::new()),
        ]);
        let req = Request::builder()
            .header(HOST, "acme.example.com")
            .header("x-company", "globex")
            .body(())
            .unwrap();
        let meta = RequestMetadata::from_request(&req);
        assert_eq!(chain.to_key(&meta).as_deref(), Some("globex"));

        let host_only = RequestMetadata::for_host("acme.example.com");
        assert_eq!(chain.to_key(&host_only).as_deref(), Some("acme"));
    }
}
