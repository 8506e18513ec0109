pub mod client;
pub mod commands;
pub mod correlation;
pub mod credential;
pub mod error;
pub mod health;
pub mod http;
pub mod integrations;
pub mod runtime;
pub mod service;

pub use client::{ClientConfig, RequestOptions, ServiceClient, ServiceResponse};
pub use correlation::{CorrelationId, RequestContext};
pub use credential::{CredentialKind, ServiceCredential};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use health::HealthStatus;
pub use service::ExternalService;
