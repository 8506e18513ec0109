//! Correlation IDs for joining logs across the caller and external APIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::Headers;

/// Canonical outbound header name.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Inbound header names checked by [`resolve`], in priority order.
pub const INBOUND_ID_HEADERS: [&str; 2] = ["x-request-id", "x-correlation-id"];

/// Opaque identifier for one logical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generates a fresh random (v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request context, immutable once created and passed around by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    correlation_id: CorrelationId,
    started_at: DateTime<Utc>,
}

impl RequestContext {
    /// New context with a freshly generated correlation ID.
    pub fn new() -> Self {
        Self::with_correlation_id(CorrelationId::generate())
    }

    pub fn with_correlation_id(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            started_at: Utc::now(),
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Reuses the identifier carried by an inbound request, or generates one.
///
/// Header names are matched case-insensitively; `x-request-id` wins over
/// `x-correlation-id`. Empty values are ignored. The value is kept verbatim.
pub fn resolve<'a, I>(incoming: I) -> RequestContext
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut found: [Option<&str>; INBOUND_ID_HEADERS.len()] = [None; INBOUND_ID_HEADERS.len()];

    for (name, value) in incoming {
        if value.is_empty() {
            continue;
        }
        for (slot, known) in found.iter_mut().zip(INBOUND_ID_HEADERS) {
            if slot.is_none() && name.eq_ignore_ascii_case(known) {
                *slot = Some(value);
            }
        }
    }

    match found.into_iter().flatten().next() {
        Some(id) => RequestContext::with_correlation_id(CorrelationId::from(id)),
        None => RequestContext::new(),
    }
}

/// Writes the context's identifier into `headers` under [`REQUEST_ID_HEADER`],
/// replacing any existing value regardless of name casing.
pub fn attach(context: &RequestContext, headers: &mut Headers) {
    headers.set(REQUEST_ID_HEADER, context.correlation_id.as_str());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert_ne!(a.correlation_id(), b.correlation_id());
        assert!(Uuid::parse_str(a.correlation_id().as_str()).is_ok());
    }

    #[test]
    fn test_resolve_reuses_request_id_verbatim() {
        let ctx = resolve([("X-Request-ID", " upstream-42 ")]);
        assert_eq!(ctx.correlation_id().as_str(), " upstream-42 ");
    }

    #[test]
    fn test_resolve_reuses_correlation_id() {
        let ctx = resolve([("content-type", "text/plain"), ("X-Correlation-Id", "corr-1")]);
        assert_eq!(ctx.correlation_id().as_str(), "corr-1");
    }

    #[test]
    fn test_resolve_prefers_request_id() {
        let ctx = resolve([("x-correlation-id", "corr"), ("x-request-id", "req")]);
        assert_eq!(ctx.correlation_id().as_str(), "req");
    }

    #[test]
    fn test_resolve_generates_when_missing_or_empty() {
        let ctx = resolve([("x-request-id", "")]);
        assert!(!ctx.correlation_id().as_str().is_empty());
        assert!(Uuid::parse_str(ctx.correlation_id().as_str()).is_ok());

        let empty: [(&str, &str); 0] = [];
        let a = resolve(empty);
        let b = resolve(empty);
        assert_ne!(a.correlation_id(), b.correlation_id());
    }

    #[test]
    fn test_resolve_from_headers() {
        let headers: Headers = vec![("X-Correlation-ID", "abc")].into_iter().collect();
        let ctx = resolve(headers.iter());
        assert_eq!(ctx.correlation_id().as_str(), "abc");
    }

    #[test]
    fn test_attach_is_idempotent() {
        let ctx = RequestContext::new();
        let mut once = Headers::new();
        attach(&ctx, &mut once);
        let mut twice = once.clone();
        attach(&ctx, &mut twice);

        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
        assert_eq!(twice.get("x-request-id"), Some(ctx.correlation_id().as_str()));
    }

    #[test]
    fn test_attach_replaces_other_casing() {
        let ctx = RequestContext::with_correlation_id("fixed".into());
        let mut headers: Headers = vec![("x-request-id", "stale")].into_iter().collect();
        attach(&ctx, &mut headers);

        let entries: Vec<_> = headers.iter().collect();
        assert_eq!(entries, vec![(REQUEST_ID_HEADER, "fixed")]);
    }

    #[test]
    fn test_correlation_id_serializes_as_string() {
        let id = CorrelationId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""abc""#);
    }
}
