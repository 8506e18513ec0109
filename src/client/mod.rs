//! Authenticated client for one external API.
//!
//! Every call goes through the same pipeline: resolve the credential (failing
//! fast when it is required and unusable), merge headers, attach the
//! correlation ID, send exactly once under a timeout, classify the response.

mod config;
mod request;

pub use config::{
    AuthPolicy, ClientConfig, DEFAULT_AUTH_HEADER, DEFAULT_AUTH_SCHEME, DEFAULT_TIMEOUT_MS,
    DEFAULT_USER_AGENT, HealthProbe,
};
pub use request::{RequestOptions, ServiceResponse};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Method, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::Instrument;

use crate::correlation::{self, CorrelationId, RequestContext};
use crate::credential::{CredentialSlot, ServiceCredential};
use crate::error::{ServiceError, ServiceResult};
use crate::health::HealthStatus;
use crate::http::{
    Headers, OutboundRequest, ReqwestTransport, StatusClass, Transport, TransportFailure,
    TransportResponse, classify_status,
};
use crate::service::ExternalService;

fn is_standard_method(method: &Method) -> bool {
    matches!(
        method.as_str(),
        "GET" | "POST" | "PUT" | "PATCH" | "DELETE" | "HEAD" | "OPTIONS"
    )
}

pub struct ServiceClient<T: Transport = ReqwestTransport> {
    config: ClientConfig,
    base_url: Url,
    credential: CredentialSlot,
    transport: T,
    destroyed: AtomicBool,
    span: tracing::Span,
}

impl ServiceClient<ReqwestTransport> {
    /// Validates `config` and builds a client over a pooled reqwest transport.
    pub fn new(config: ClientConfig) -> ServiceResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::build(&config.user_agent, config.title_case_headers)
            .map_err(|e| {
                ServiceError::configuration(
                    &config.name,
                    format!("failed to build HTTP client: {}", e),
                )
            })?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ServiceClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> ServiceResult<Self> {
        let span = tracing::info_span!("service", name = %config.name);
        Self::with_span(config, transport, span)
    }

    /// Like [`with_transport`](Self::with_transport), logging inside `span`.
    pub fn with_span(
        mut config: ClientConfig,
        transport: T,
        span: tracing::Span,
    ) -> ServiceResult<Self> {
        let base_url = config.validate()?;
        let credential = CredentialSlot::new(config.credential.take());

        span.in_scope(|| {
            debug!(
                "{}: client ready for {} (timeout {}ms, auth {:?})",
                config.name, base_url, config.timeout_ms, config.auth
            );
        });

        Ok(Self {
            config,
            base_url,
            credential,
            transport,
            destroyed: AtomicBool::new(false),
            span,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current credential reference.
    pub fn credential(&self) -> Option<Arc<ServiceCredential>> {
        self.credential.snapshot()
    }

    /// Swaps the credential. Calls already in flight keep the one they read.
    pub fn replace_credential(&self, credential: Option<ServiceCredential>) {
        let _enter = self.span.enter();
        match &credential {
            Some(c) => debug!("{}: credential replaced ({})", self.config.name, c.masked()),
            None => debug!("{}: credential cleared", self.config.name),
        }
        self.credential.replace(credential);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Performs one call and classifies the outcome.
    ///
    /// `path` is relative to the base URL. The transport is invoked at most
    /// once; nothing is retried or cached.
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> ServiceResult<ServiceResponse<R>> {
        let context = options.context.clone().unwrap_or_default();
        let span = tracing::debug_span!(
            parent: &self.span,
            "request",
            method = %method,
            path = %path,
            correlation_id = %context.correlation_id()
        );
        self.execute(method, path, body, &options, context)
            .instrument(span)
            .await
    }

    async fn execute<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
        context: RequestContext,
    ) -> ServiceResult<ServiceResponse<R>> {
        let correlation_id = context.correlation_id().clone();

        if self.is_destroyed() {
            return Err(self.transport_error(
                TransportFailure::Closed,
                "client has been destroyed".to_string(),
                correlation_id,
            ));
        }

        let request = self
            .build_request(&method, path, body, options, &context)
            .map_err(|e| e.for_request(&correlation_id))?;
        let timeout = request.timeout;
        debug!("{} {} [request {}]", method, request.url, correlation_id);

        let response = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(
                    "{}: {} {} failed: {} [request {}]",
                    self.config.name, method, path, e, correlation_id
                );
                return Err(self.transport_error(e.kind, e.message, correlation_id));
            }
            Err(_) => {
                warn!(
                    "{}: {} {} timed out after {}ms [request {}]",
                    self.config.name,
                    method,
                    path,
                    timeout.as_millis(),
                    correlation_id
                );
                return Err(self.transport_error(
                    TransportFailure::Timeout,
                    format!("no response within {}ms", timeout.as_millis()),
                    correlation_id,
                ));
            }
        };

        self.classify(response, correlation_id)
    }

    fn build_request(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
        context: &RequestContext,
    ) -> ServiceResult<OutboundRequest> {
        if !is_standard_method(method) {
            return Err(ServiceError::configuration(
                &self.config.name,
                format!("unsupported HTTP method {}", method),
            ));
        }

        let url = self.resolve_url(path)?;

        let timeout = options
            .timeout
            .unwrap_or(Duration::from_millis(self.config.timeout_ms));
        if timeout.is_zero() {
            return Err(ServiceError::configuration(
                &self.config.name,
                "per-call timeout must be greater than zero",
            ));
        }

        let credential = self.usable_credential(context.correlation_id())?;

        let mut headers = Headers::new();
        headers.set("Accept", "application/json");
        if body.is_some() {
            headers.set("Content-Type", "application/json");
        }
        headers.merge(&self.config.default_headers);
        headers.merge(&options.headers);
        if let Some(credential) = credential {
            headers.set(
                self.config.auth_header.clone(),
                credential.header_value(&self.config.auth_scheme),
            );
        }
        correlation::attach(context, &mut headers);

        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ServiceError::Payload {
                service: self.config.name.clone(),
                message: format!("failed to encode request body: {}", e),
                correlation_id: Some(context.correlation_id().clone()),
            })?;

        Ok(OutboundRequest {
            method: method.clone(),
            url,
            headers,
            body,
            timeout,
        })
    }

    /// Joins `path` onto the base URL. The result must stay under the base
    /// path; a query string may hold anything, including other URLs.
    fn resolve_url(&self, path: &str) -> ServiceResult<Url> {
        let path_part = path.split(['?', '#']).next().unwrap_or_default();
        if path_part.contains("://") || path_part.starts_with("//") {
            return Err(ServiceError::configuration(
                &self.config.name,
                format!("path {:?} must be relative to the base URL", path),
            ));
        }

        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let url = Url::parse(&joined).map_err(|e| {
            ServiceError::configuration(&self.config.name, format!("invalid path {:?}: {}", path, e))
        })?;

        // Dot segments are resolved by the parser; check where they landed.
        let base_path = self.base_url.path().trim_end_matches('/');
        let under_base = url.path() == base_path
            || url
                .path()
                .strip_prefix(base_path)
                .is_some_and(|rest| rest.starts_with('/'));
        if url.origin() != self.base_url.origin() || !under_base {
            return Err(ServiceError::configuration(
                &self.config.name,
                format!("path {:?} escapes the base URL {}", path, self.base_url),
            ));
        }
        Ok(url)
    }

    /// Reads the credential reference once. `None` means send without one.
    fn usable_credential(
        &self,
        correlation_id: &CorrelationId,
    ) -> ServiceResult<Option<Arc<ServiceCredential>>> {
        let problem = match self.credential.snapshot() {
            Some(c) if c.is_expired() => format!(
                "credential expired at {}",
                c.expires_at().map(|t| t.to_rfc3339()).unwrap_or_default()
            ),
            Some(c) => return Ok(Some(c)),
            None => "no credential configured".to_string(),
        };

        match self.config.auth {
            AuthPolicy::Required => {
                warn!(
                    "{}: {}, request not sent [request {}]",
                    self.config.name, problem, correlation_id
                );
                Err(ServiceError::Authentication {
                    service: self.config.name.clone(),
                    status: None,
                    message: problem,
                    correlation_id: Some(correlation_id.clone()),
                })
            }
            AuthPolicy::Anonymous => {
                debug!("{}: {}, sending anonymously", self.config.name, problem);
                Ok(None)
            }
        }
    }

    fn classify<R: DeserializeOwned>(
        &self,
        response: TransportResponse,
        correlation_id: CorrelationId,
    ) -> ServiceResult<ServiceResponse<R>> {
        let status = response.status;
        let service = self.config.name.clone();

        match classify_status(status) {
            StatusClass::Success => {
                debug!("HTTP {} [request {}]", status, correlation_id);
                let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
                    b"null"
                } else {
                    &response.body
                };
                match serde_json::from_slice(body) {
                    Ok(data) => Ok(ServiceResponse {
                        status,
                        correlation_id,
                        data,
                    }),
                    Err(e) => Err(ServiceError::Payload {
                        service,
                        message: format!("failed to decode HTTP {} response: {}", status, e),
                        correlation_id: Some(correlation_id),
                    }),
                }
            }
            StatusClass::Authentication => {
                warn!(
                    "{}: credential rejected with HTTP {} [request {}]",
                    service, status, correlation_id
                );
                Err(ServiceError::Authentication {
                    service,
                    status: Some(status),
                    message: format!("credential rejected with HTTP {}", status),
                    correlation_id: Some(correlation_id),
                })
            }
            StatusClass::Client => {
                warn!("{}: HTTP {} [request {}]", service, status, correlation_id);
                Err(ServiceError::Client {
                    service,
                    status,
                    body: String::from_utf8_lossy(&response.body).into_owned(),
                    correlation_id: Some(correlation_id),
                })
            }
            StatusClass::Server => {
                warn!("{}: HTTP {} [request {}]", service, status, correlation_id);
                Err(ServiceError::Server {
                    service,
                    status,
                    body: String::from_utf8_lossy(&response.body).into_owned(),
                    correlation_id: Some(correlation_id),
                })
            }
        }
    }

    fn transport_error(
        &self,
        kind: TransportFailure,
        message: String,
        correlation_id: CorrelationId,
    ) -> ServiceError {
        ServiceError::Transport {
            service: self.config.name.clone(),
            kind,
            message,
            correlation_id: Some(correlation_id),
        }
    }

    /// Encodes `body` and performs the call, tagging an encode failure with
    /// the same correlation ID the request would have used.
    async fn send_json<B, R>(&self, method: Method, path: &str, body: &B) -> ServiceResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let context = RequestContext::new();
        let body = serde_json::to_value(body).map_err(|e| ServiceError::Payload {
            service: self.config.name.clone(),
            message: format!("failed to encode request body: {}", e),
            correlation_id: Some(context.correlation_id().clone()),
        })?;
        self.request(method, path, Some(&body), RequestOptions::new().with_context(context))
            .await
            .map(ServiceResponse::into_data)
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> ServiceResult<R> {
        self.request(Method::GET, path, None, RequestOptions::default())
            .await
            .map(ServiceResponse::into_data)
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> ServiceResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body).await
    }

    pub async fn put<B, R>(&self, path: &str, body: &B) -> ServiceResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, body).await
    }

    pub async fn patch<B, R>(&self, path: &str, body: &B) -> ServiceResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, body).await
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> ServiceResult<R> {
        self.request(Method::DELETE, path, None, RequestOptions::default())
            .await
            .map(ServiceResponse::into_data)
    }

    /// Runs the configured probe. Never fails; any error becomes `Unhealthy`.
    pub async fn check_health(&self) -> HealthStatus {
        let probe = &self.config.health_probe;
        let outcome = self
            .request::<Value>(
                probe.method.clone(),
                &probe.path,
                probe.body.as_ref(),
                RequestOptions::default(),
            )
            .await;
        HealthStatus::from_outcome(&outcome)
    }

    /// Releases transport resources. Later calls are no-ops.
    pub fn destroy(&self) {
        let _enter = self.span.enter();
        if self.destroyed.swap(true, Ordering::AcqRel) {
            debug!("{}: already destroyed", self.config.name);
            return;
        }
        self.transport.close();
        debug!("{}: transport released", self.config.name);
    }
}

#[async_trait]
impl<T: Transport> ExternalService for ServiceClient<T> {
    fn name(&self) -> &str {
        ServiceClient::name(self)
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> ServiceResult<ServiceResponse<Value>> {
        self.request(method, path, body.as_ref(), options).await
    }

    async fn check_health(&self) -> HealthStatus {
        ServiceClient::check_health(self).await
    }

    fn destroy(&self) {
        ServiceClient::destroy(self)
    }
}
