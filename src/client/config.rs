use reqwest::{Method, Url};
use serde_json::Value;

use crate::credential::ServiceCredential;
use crate::error::{ServiceError, ServiceResult};
use crate::http::Headers;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_AUTH_HEADER: &str = "Authorization";
pub const DEFAULT_AUTH_SCHEME: &str = "Bearer";
pub const DEFAULT_USER_AGENT: &str = concat!("svcgate/", env!("CARGO_PKG_VERSION"));

/// Whether a request may go out without a usable credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPolicy {
    /// Missing or expired credential fails the call before any network I/O.
    #[default]
    Required,
    /// The credential is attached when usable and omitted otherwise.
    Anonymous,
}

/// Request issued by `check_health`.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthProbe {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl HealthProbe {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self::get("/")
    }
}

/// Static configuration of one external-service integration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub name: String,
    pub base_url: String,
    pub default_headers: Headers,
    pub timeout_ms: u64,
    pub credential: Option<ServiceCredential>,
    pub auth: AuthPolicy,
    /// Prefix placed before the token, e.g. `Bearer`, GitHub's `token`.
    pub auth_scheme: String,
    pub auth_header: String,
    pub health_probe: HealthProbe,
    pub user_agent: String,
    /// Send HTTP/1 header names in Title-Case instead of lowercase.
    pub title_case_headers: bool,
}

impl ClientConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            default_headers: Headers::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            credential: None,
            auth: AuthPolicy::Required,
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            health_probe: HealthProbe::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            title_case_headers: false,
        }
    }

    pub fn with_credential(mut self, credential: ServiceCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.set(name, value);
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = AuthPolicy::Anonymous;
        self
    }

    pub fn with_auth_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.auth_scheme = scheme.into();
        self
    }

    pub fn with_auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self
    }

    pub fn with_health_probe(mut self, probe: HealthProbe) -> Self {
        self.health_probe = probe;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_title_case_headers(mut self, enabled: bool) -> Self {
        self.title_case_headers = enabled;
        self
    }

    /// Checks that `base_url` is an absolute http(s) URL with a host and
    /// that `timeout_ms` is positive. Returns the parsed base URL.
    pub fn validate(&self) -> ServiceResult<Url> {
        if self.timeout_ms == 0 {
            return Err(ServiceError::configuration(
                &self.name,
                "timeout_ms must be greater than zero",
            ));
        }

        let url = Url::parse(&self.base_url).map_err(|e| {
            ServiceError::configuration(
                &self.name,
                format!("base_url {:?} is not an absolute URL: {}", self.base_url, e),
            )
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ServiceError::configuration(
                &self.name,
                format!("base_url {:?} must be an http(s) URL with a host", self.base_url),
            ));
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("crm", "https://api.example.com");
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.auth, AuthPolicy::Required);
        assert_eq!(config.auth_header, "Authorization");
        assert_eq!(config.auth_scheme, "Bearer");
        assert_eq!(config.health_probe, HealthProbe::get("/"));
        assert!(config.user_agent.starts_with("svcgate/"));
    }

    #[test]
    fn test_validate_accepts_absolute_urls() {
        for url in [
            "https://api.example.com",
            "http://localhost:8080/api/",
            "https://slack.com/api",
        ] {
            assert!(ClientConfig::new("s", url).validate().is_ok(), "{}", url);
        }
    }

    #[test]
    fn test_validate_rejects_relative_or_odd_urls() {
        for url in ["/api", "api.example.com", "", "mailto:x@example.com", "file:///tmp"] {
            let err = ClientConfig::new("s", url).validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigurationError, "{}", url);
        }
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let err = ClientConfig::new("s", "https://api.example.com")
            .with_timeout_ms(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("jobber", "https://api.getjobber.com/api")
            .with_header("X-JOBBER-GRAPHQL-VERSION", "2025-01-20")
            .with_auth_scheme("bearer")
            .with_timeout_ms(5_000)
            .anonymous();

        assert_eq!(
            config.default_headers.get("x-jobber-graphql-version"),
            Some("2025-01-20")
        );
        assert_eq!(config.auth_scheme, "bearer");
        assert_eq!(config.timeout_ms, 5_000);
        assert_eq!(config.auth, AuthPolicy::Anonymous);
    }
}
