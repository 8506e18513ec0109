//! Classified failures returned by every service call.

use serde::Serialize;

use crate::correlation::CorrelationId;
use crate::http::TransportFailure;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure category, used for health reasons and caller retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ConfigurationError,
    AuthenticationError,
    ClientError,
    ServerError,
    TransportError,
    PayloadError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigurationError => "ConfigurationError",
            ErrorKind::AuthenticationError => "AuthenticationError",
            ErrorKind::ClientError => "ClientError",
            ErrorKind::ServerError => "ServerError",
            ErrorKind::TransportError => "TransportError",
            ErrorKind::PayloadError => "PayloadError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders `" [request <id>]"` when a correlation ID is known.
struct RequestTag<'a>(&'a Option<CorrelationId>);

impl std::fmt::Display for RequestTag<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(id) => write!(f, " [request {}]", id),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Invalid client setup or call shape. Never reaches the network.
    /// Setup errors have no correlation ID; call-shape errors do.
    #[error("{service}: invalid configuration: {message}{}", RequestTag(.correlation_id))]
    Configuration {
        service: String,
        message: String,
        correlation_id: Option<CorrelationId>,
    },

    /// Missing, expired (`status: None`) or rejected (401/403) credential.
    #[error("{service}: authentication failed: {message}{}", RequestTag(.correlation_id))]
    Authentication {
        service: String,
        status: Option<u16>,
        message: String,
        correlation_id: Option<CorrelationId>,
    },

    /// 4xx other than 401/403; body kept verbatim.
    #[error("{service}: request rejected with HTTP {status}{}", RequestTag(.correlation_id))]
    Client {
        service: String,
        status: u16,
        body: String,
        correlation_id: Option<CorrelationId>,
    },

    /// 5xx.
    #[error("{service}: server error HTTP {status}{}", RequestTag(.correlation_id))]
    Server {
        service: String,
        status: u16,
        body: String,
        correlation_id: Option<CorrelationId>,
    },

    #[error("{service}: transport {kind}: {message}{}", RequestTag(.correlation_id))]
    Transport {
        service: String,
        kind: TransportFailure,
        message: String,
        correlation_id: Option<CorrelationId>,
    },

    /// Body could not be encoded, or a 2xx body did not match the expected type.
    #[error("{service}: payload error: {message}{}", RequestTag(.correlation_id))]
    Payload {
        service: String,
        message: String,
        correlation_id: Option<CorrelationId>,
    },
}

impl ServiceError {
    pub fn configuration(service: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Configuration {
            service: service.into(),
            message: message.into(),
            correlation_id: None,
        }
    }

    /// Tags the error with the call it belongs to, unless it already names one.
    pub(crate) fn for_request(mut self, id: &CorrelationId) -> Self {
        match &mut self {
            ServiceError::Configuration { correlation_id, .. }
            | ServiceError::Authentication { correlation_id, .. }
            | ServiceError::Client { correlation_id, .. }
            | ServiceError::Server { correlation_id, .. }
            | ServiceError::Transport { correlation_id, .. }
            | ServiceError::Payload { correlation_id, .. } => {
                if correlation_id.is_none() {
                    *correlation_id = Some(id.clone());
                }
            }
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Configuration { .. } => ErrorKind::ConfigurationError,
            ServiceError::Authentication { .. } => ErrorKind::AuthenticationError,
            ServiceError::Client { .. } => ErrorKind::ClientError,
            ServiceError::Server { .. } => ErrorKind::ServerError,
            ServiceError::Transport { .. } => ErrorKind::TransportError,
            ServiceError::Payload { .. } => ErrorKind::PayloadError,
        }
    }

    pub fn service(&self) -> &str {
        match self {
            ServiceError::Configuration { service, .. }
            | ServiceError::Authentication { service, .. }
            | ServiceError::Client { service, .. }
            | ServiceError::Server { service, .. }
            | ServiceError::Transport { service, .. }
            | ServiceError::Payload { service, .. } => service,
        }
    }

    /// HTTP status, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Authentication { status, .. } => *status,
            ServiceError::Client { status, .. } | ServiceError::Server { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        match self {
            ServiceError::Configuration { correlation_id, .. }
            | ServiceError::Authentication { correlation_id, .. }
            | ServiceError::Client { correlation_id, .. }
            | ServiceError::Server { correlation_id, .. }
            | ServiceError::Transport { correlation_id, .. }
            | ServiceError::Payload { correlation_id, .. } => correlation_id.as_ref(),
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Server { .. } => true,
            ServiceError::Transport { kind, .. } => *kind != TransportFailure::Closed,
            _ => false,
        }
    }
}
