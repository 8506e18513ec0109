use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;

use crate::client::ClientConfig;
use crate::integrations::{ServiceKind, google, jobber};
use crate::runtime::{Runtime, env_opt};

pub const JOBBER_API_VERSION_VAR: &str = "JOBBER_API_VERSION";
pub const JOBBER_VERSION_HEADER_VAR: &str = "JOBBER_VERSION_HEADER";

/// Builds the client configuration for `kind` from environment variables.
///
/// A missing token is not an error here: the client is built without a
/// credential and its calls fail fast with an authentication error.
#[tracing::instrument(skip(runtime))]
pub fn load_config<R: Runtime + ?Sized>(runtime: &R, kind: ServiceKind) -> Result<ClientConfig> {
    let token = env_opt(runtime, kind.token_var());

    let mut config = match kind {
        ServiceKind::Jobber => {
            let header = env_opt(runtime, JOBBER_VERSION_HEADER_VAR)
                .unwrap_or_else(|| jobber::VERSION_HEADER.to_string());
            let version = env_opt(runtime, JOBBER_API_VERSION_VAR)
                .unwrap_or_else(|| jobber::DEFAULT_API_VERSION.to_string());
            jobber::config(token, &header, &version)
        }
        ServiceKind::Google => {
            let expires_at = env_opt(runtime, google::EXPIRES_AT_VAR)
                .map(|v| parse_timestamp(&v))
                .transpose()
                .with_context(|| format!("Invalid {}", google::EXPIRES_AT_VAR))?;
            google::config(token, expires_at)
        }
        _ => kind.default_config(token),
    };

    let prefix = kind.env_prefix();

    if let Some(base_url) = env_opt(runtime, &format!("{}_BASE_URL", prefix)) {
        debug!("{}: base URL overridden to {}", kind, base_url);
        config.base_url = base_url;
    }

    let timeout_var = format!("{}_TIMEOUT_MS", prefix);
    if let Some(timeout) = env_opt(runtime, &timeout_var) {
        config.timeout_ms = timeout
            .trim()
            .parse()
            .with_context(|| format!("{} must be a whole number of milliseconds", timeout_var))?;
    }

    match &config.credential {
        Some(credential) => debug!(
            "Using {} for authentication: {}",
            kind.token_var(),
            credential.masked()
        ),
        None => debug!("{} is not set; {} has no credential", kind.token_var(), kind),
    }

    Ok(config)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value.trim())
        .with_context(|| format!("{:?} is not an RFC 3339 timestamp", value))?;
    Ok(parsed.with_timezone(&Utc))
}
