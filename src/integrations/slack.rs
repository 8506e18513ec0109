//! Slack Web API. Slack answers most failures with HTTP 200 and
//! `{"ok": false, "error": "..."}`, so responses are reclassified here.

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

pub const NAME: &str = "slack";
pub const DEFAULT_BASE_URL: &str = "https://slack.com/api";
pub const TOKEN_VAR: &str = "SLACK_BOT_TOKEN";

/// `error` codes that mean the token itself is bad.
const AUTH_ERRORS: [&str; 5] = [
    "invalid_auth",
    "not_authed",
    "token_revoked",
    "token_expired",
    "account_inactive",
];

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SlackAuth {
    pub ok: bool,
    pub error: Option<String>,
    pub url: Option<String>,
    pub team: Option<String>,
    pub user: Option<String>,
    pub team_id: Option<String>,
    pub user_id: Option<String>,
    pub bot_id: Option<String>,
}

/// Health goes through [`Slack::auth_test`] rather than the client's probe,
/// since a 200 alone says nothing about the token.
pub fn config(token: Option<String>) -> ClientConfig {
    let config = ClientConfig::new(NAME, DEFAULT_BASE_URL);
    match token {
        Some(token) => config.with_credential(ServiceCredential::bearer(token)),
        None => config,
    }
}

pub struct Slack<T: Transport = ReqwestTransport> {
    client: ServiceClient<T>,
}

impl Slack {
    pub fn new(config: ClientConfig) -> ServiceResult<Self> {
        Ok(Self {
            client: ServiceClient::new(config)?,
        })
    }
}

impl<T: Transport> Slack<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> ServiceResult<Self> {
        Ok(Self {
            client: ServiceClient::with_transport(config, transport)?,
        })
    }

    pub fn client(&self) -> &ServiceClient<T> {
        &self.client
    }

    /// Calls `auth.test`; `ok: false` becomes a classified error.
    #[tracing::instrument(skip(self))]
    pub async fn auth_test(&self) -> ServiceResult<SlackAuth> {
        let response = self
            .client
            .request::<SlackAuth>(
                Method::POST,
                "/auth.test",
                Some(&json!({})),
                RequestOptions::default(),
            )
            .await?;
        reclassify(self.client.name(), response)
    }
}

fn reclassify(service: &str, response: ServiceResponse<SlackAuth>) -> ServiceResult<SlackAuth> {
    if response.data.ok {
        return Ok(response.data);
    }

    let error = response
        .data
        .error
        .unwrap_or_else(|| "unknown_error".to_string());

    if AUTH_ERRORS.contains(&error.as_str()) {
        Err(ServiceError::Authentication {
            service: service.to_string(),
            status: Some(response.status),
            message: format!("token rejected: {}", error),
            correlation_id: Some(response.correlation_id),
        })
    } else {
        Err(ServiceError::Client {
            service: service.to_string(),
            status: response.status,
            body: error,
            correlation_id: Some(response.correlation_id),
        })
    }
}

#[async_trait]
impl<T: Transport> ExternalService for Slack<T> {
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
        HealthStatus::from_outcome(&self.auth_test().await)
    }

    fn destroy(&self) {
        self.client.destroy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mockito::Matcher;

    fn slack(url: &str) -> Slack {
        let mut config = config(Some("xoxb-test".to_string()));
        config.base_url = url.to_string();
        Slack::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_auth_test_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth.test")
            .match_header("authorization", "Bearer xoxb-test")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({})))
            .with_status(200)
            .with_body(r#"{"ok": true, "team": "Acme", "user": "sky", "user_id": "U1", "bot_id": "B1"}"#)
            .create_async()
            .await;

        let auth = slack(&server.url()).auth_test().await.unwrap();

        mock.assert_async().await;
        assert!(auth.ok);
        assert_eq!(auth.team.as_deref(), Some("Acme"));
        assert_eq!(auth.bot_id.as_deref(), Some("B1"));
    }

    #[tokio::test]
    async fn test_auth_test_invalid_auth_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/auth.test")
            .with_status(200)
            .with_body(r#"{"ok": false, "error": "invalid_auth"}"#)
            .create_async()
            .await;

        let slack = slack(&server.url());
        let err = slack.auth_test().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AuthenticationError);
        assert_eq!(err.status(), Some(200));
        assert_eq!(
            ExternalService::check_health(&slack).await,
            HealthStatus::Unhealthy {
                reason: ErrorKind::AuthenticationError
            }
        );
    }

    #[tokio::test]
    async fn test_auth_test_other_error_is_client_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/auth.test")
            .with_status(200)
            .with_body(r#"{"ok": false, "error": "ratelimited"}"#)
            .create_async()
            .await;

        let err = slack(&server.url()).auth_test().await.unwrap_err();

        match err {
            ServiceError::Client { status, body, .. } => {
                assert_eq!(status, 200);
                assert_eq!(body, "ratelimited");
            }
            other => panic!("expected client error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_health_uses_auth_test() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth.test")
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .expect(1)
            .create_async()
            .await;

        let slack = slack(&server.url());
        assert!(ExternalService::check_health(&slack).await.is_healthy());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_health_token_revoked_with_http_200() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/auth.test")
            .with_status(200)
            .with_body(r#"{"ok": false, "error": "token_revoked"}"#)
            .create_async()
            .await;

        let slack = slack(&server.url());
        assert_eq!(
            ExternalService::check_health(&slack).await,
            HealthStatus::Unhealthy {
                reason: ErrorKind::AuthenticationError
            }
        );
    }
}
