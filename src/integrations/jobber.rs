//! Jobber field-service CRM (GraphQL).
//!
//! Jobber wants a lowercase `bearer` scheme and a dated API version header.
//! The version header name is configurable. Header names go out HTTP/1
//! title-cased (`X-Jobber-Graphql-Version`), the closest the HTTP stack gets
//! to the upper-case form Jobber documents.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::client::{ClientConfig, RequestOptions, ServiceClient, ServiceResponse};
use crate::credential::ServiceCredential;
use crate::error::{ServiceError, ServiceResult};
use crate::health::HealthStatus;
use crate::http::{ReqwestTransport, Transport};
use crate::service::ExternalService;

pub const NAME: &str = "jobber";
pub const DEFAULT_BASE_URL: &str = "https://api.getjobber.com/api";
pub const TOKEN_VAR: &str = "JOBBER_ACCESS_TOKEN";
pub const VERSION_HEADER: &str = "X-JOBBER-GRAPHQL-VERSION";
pub const DEFAULT_API_VERSION: &str = "2025-01-20";

const HEALTH_QUERY: &str = "{ __typename }";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<Value>,
}

/// Health is checked with a `{ __typename }` query rather than the client's
/// probe, so GraphQL errors in a 200 also count as unhealthy.
pub fn config(token: Option<String>, version_header: &str, api_version: &str) -> ClientConfig {
    let config = ClientConfig::new(NAME, DEFAULT_BASE_URL)
        .with_auth_scheme("bearer")
        .with_header(version_header, api_version)
        .with_title_case_headers(true);
    match token {
        Some(token) => config.with_credential(ServiceCredential::bearer(token)),
        None => config,
    }
}

pub struct Jobber<T: Transport = ReqwestTransport> {
    client: ServiceClient<T>,
}

impl Jobber {
    pub fn new(config: ClientConfig) -> ServiceResult<Self> {
        Ok(Self {
            client: ServiceClient::new(config)?,
        })
    }
}

impl<T: Transport> Jobber<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> ServiceResult<Self> {
        Ok(Self {
            client: ServiceClient::with_transport(config, transport)?,
        })
    }

    pub fn client(&self) -> &ServiceClient<T> {
        &self.client
    }

    /// Runs a GraphQL query and returns its `data`.
    ///
    /// A 200 carrying `errors` and no `data` is a `Client` error whose body is
    /// the JSON-encoded error list.
    #[tracing::instrument(skip(self, variables))]
    pub async fn query(&self, query: &str, variables: Option<Value>) -> ServiceResult<Value> {
        let mut body = json!({ "query": query });
        if let Some(variables) = variables {
            body["variables"] = variables;
        }

        let response = self
            .client
            .request::<GraphQlResponse>(Method::POST, "/graphql", Some(&body), RequestOptions::default())
            .await?;

        match response.data.data {
            Some(data) if !data.is_null() => Ok(data),
            _ if !response.data.errors.is_empty() => Err(ServiceError::Client {
                service: self.client.name().to_string(),
                status: response.status,
                body: Value::Array(response.data.errors).to_string(),
                correlation_id: Some(response.correlation_id),
            }),
            _ => Ok(Value::Null),
        }
    }
}

#[async_trait]
impl<T: Transport> ExternalService for Jobber<T> {
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
        HealthStatus::from_outcome(&self.query(HEALTH_QUERY, None).await)
    }

    fn destroy(&self) {
        self.client.destroy()
    }
}
