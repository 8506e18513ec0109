use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::client::{ClientConfig, HealthProbe, RequestOptions, ServiceClient, ServiceResponse};
use crate::credential::ServiceCredential;
use crate::error::ServiceResult;
use crate::health::HealthStatus;
use crate::http::{ReqwestTransport, Transport};
use crate::service::ExternalService;

pub const NAME: &str = "google";
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
pub const TOKEN_VAR: &str = "GOOGLE_ACCESS_TOKEN";
pub const EXPIRES_AT_VAR: &str = "GOOGLE_TOKEN_EXPIRES_AT";

const USERINFO_PATH: &str = "/oauth2/v3/userinfo";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// OAuth access tokens expire; pass the expiry so stale tokens fail fast.
pub fn config(token: Option<String>, expires_at: Option<DateTime<Utc>>) -> ClientConfig {
    let config =
        ClientConfig::new(NAME, DEFAULT_BASE_URL).with_health_probe(HealthProbe::get(USERINFO_PATH));
    match token {
        Some(token) => config.with_credential(ServiceCredential::oauth(token, expires_at)),
        None => config,
    }
}

pub struct Google<T: Transport = ReqwestTransport> {
    client: ServiceClient<T>,
}

impl Google {
    pub fn new(config: ClientConfig) -> ServiceResult<Self> {
        Ok(Self {
            client: ServiceClient::new(config)?,
        })
    }
}

impl<T: Transport> Google<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> ServiceResult<Self> {
        Ok(Self {
            client: ServiceClient::with_transport(config, transport)?,
        })
    }

    pub fn client(&self) -> &ServiceClient<T> {
        &self.client
    }

    #[tracing::instrument(skip(self))]
    pub async fn user_info(&self) -> ServiceResult<GoogleUserInfo> {
        self.client.get(USERINFO_PATH).await
    }
}

#[async_trait]
impl<T: Transport> ExternalService for Google<T> {
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
