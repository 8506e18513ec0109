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

pub const NAME: &str = "github";
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GitHubUser {
    pub login: String,
    pub name: Option<String>,
    pub public_repos: Option<u64>,
}

/// GitHub uses the `token` scheme and a versioned media type.
pub fn config(token: Option<String>) -> ClientConfig {
    let config = ClientConfig::new(NAME, DEFAULT_BASE_URL)
        .with_auth_scheme("token")
        .with_header("Accept", "application/vnd.github.v3+json")
        .with_health_probe(HealthProbe::get("/user"));
    match token {
        Some(token) => config.with_credential(ServiceCredential::bearer(token)),
        None => config,
    }
}

pub struct GitHub<T: Transport = ReqwestTransport> {
    client: ServiceClient<T>,
}

impl GitHub {
    pub fn new(config: ClientConfig) -> ServiceResult<Self> {
        Ok(Self {
            client: ServiceClient::new(config)?,
        })
    }
}

impl<T: Transport> GitHub<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> ServiceResult<Self> {
        Ok(Self {
            client: ServiceClient::with_transport(config, transport)?,
        })
    }

    pub fn client(&self) -> &ServiceClient<T> {
        &self.client
    }

    /// The user the token belongs to.
    #[tracing::instrument(skip(self))]
    pub async fn authenticated_user(&self) -> ServiceResult<GitHubUser> {
        self.client.get("/user").await
    }
}

#[async_trait]
impl<T: Transport> ExternalService for GitHub<T> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mockito::Matcher;

    fn github(url: &str, token: Option<&str>) -> GitHub {
        let mut config = config(token.map(String::from));
        config.base_url = url.to_string();
        GitHub::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_authenticated_user() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/user")
            .match_header("authorization", "token ghp_test")
            .match_header("accept", "application/vnd.github.v3+json")
            .match_header("user-agent", Matcher::Regex("^svcgate/".to_string()))
            .match_header("x-request-id", Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"login": "octocat", "name": "The Octocat", "public_repos": 8}"#)
            .create_async()
            .await;

        let user = github(&server.url(), Some("ghp_test"))
            .authenticated_user()
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(user.login, "octocat");
        assert_eq!(user.name.as_deref(), Some("The Octocat"));
        assert_eq!(user.public_repos, Some(8));
    }

    #[tokio::test]
    async fn test_authenticated_user_bad_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/user")
            .with_status(401)
            .with_body(r#"{"message": "Bad credentials"}"#)
            .create_async()
            .await;

        let err = github(&server.url(), Some("ghp_revoked"))
            .authenticated_user()
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind(), ErrorKind::AuthenticationError);
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_missing_token_never_hits_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/user").expect(0).create_async().await;

        let github = github(&server.url(), None);
        let health = ExternalService::check_health(&github).await;

        mock.assert_async().await;
        assert_eq!(
            health,
            HealthStatus::Unhealthy {
                reason: ErrorKind::AuthenticationError
            }
        );
    }

    #[tokio::test]
    async fn test_health_probe() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/user")
            .with_status(200)
            .with_body(r#"{"login": "octocat"}"#)
            .create_async()
            .await;

        let github = github(&server.url(), Some("ghp_test"));
        assert_eq!(ExternalService::name(&github), NAME);
        assert!(ExternalService::check_health(&github).await.is_healthy());
    }
}
