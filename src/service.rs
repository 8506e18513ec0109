//! Operation surface shared by every external-service integration.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::client::{RequestOptions, ServiceResponse};
use crate::error::ServiceResult;
use crate::health::HealthStatus;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExternalService: Send + Sync {
    fn name(&self) -> &str;

    /// Untyped call through the service's authenticated pipeline.
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> ServiceResult<ServiceResponse<Value>>;

    async fn check_health(&self) -> HealthStatus;

    fn destroy(&self);
}
