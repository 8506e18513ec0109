use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::client::{ClientConfig, HealthProbe, RequestOptions, ServiceClient, ServiceResponse};
use crate::credential::ServiceCredential;
use crate::error::ServiceResult;
use crate::health::HealthStatus;
use crate::http::{ReqwestTransport, Transport};
use crate::service::ExternalService;

pub const NAME: &str = "sendgrid";
pub const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com/v3";
pub const TOKEN_VAR: &str = "SENDGRID_API_KEY";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SendGridAccount {
    #[serde(rename = "type")]
    pub account_type: String,
    pub reputation: Option<f64>,
}

pub fn config(api_key: Option<String>) -> ClientConfig {
    let config = ClientConfig::new(NAME, DEFAULT_BASE_URL)
        .with_health_probe(HealthProbe::get("/user/account"));
    match api_key {
        Some(key) => config.with_credential(ServiceCredential::bearer(key)),
        None => config,
    }
}

pub struct SendGrid<T: Transport = ReqwestTransport> {
    client: ServiceClient<T>,
}

impl SendGrid {
    pub fn new(config: ClientConfig) -> ServiceResult<Self> {
        Ok(Self {
            client: ServiceClient::new(config)?,
        })
    }
}

impl<T: Transport> SendGrid<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> ServiceResult<Self> {
        Ok(Self {
            client: ServiceClient::with_transport(config, transport)?,
        })
    }

    pub fn client(&self) -> &ServiceClient<T> {
        &self.client
    }

    #[tracing::instrument(skip(self))]
    pub async fn account(&self) -> ServiceResult<SendGridAccount> {
        self.client.get("/user/account").await
    }
}

#[async_trait]
impl<T: Transport> ExternalService for SendGrid<T> {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> ServiceResult<ServiceResponse<Value>> {
        self.client.request(method, path, body.as_ref(), options).await
    }

    async fn check_health(&self) -> HealthStatus {
        self.client.check_health().await
    }

    fn destroy(&self) {
        self.client.destroy()
    }
}
