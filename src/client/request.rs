use std::time::Duration;

use crate::correlation::{CorrelationId, RequestContext};
use crate::http::Headers;

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the client timeout for this call only.
    pub timeout: Option<Duration>,
    /// Merged over the client's default headers.
    pub headers: Headers,
    /// Propagated context; a fresh one is created when absent.
    pub context: Option<RequestContext>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Successful call: decoded body plus the metadata needed to join logs.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse<T> {
    pub status: u16,
    pub correlation_id: CorrelationId,
    pub data: T,
}

impl<T> ServiceResponse<T> {
    pub fn into_data(self) -> T {
        self.data
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ServiceResponse<U> {
        ServiceResponse {
            status: self.status,
            correlation_id: self.correlation_id,
            data: f(self.data),
        }
    }
}
