//! Built-in integrations. Each wraps a [`ServiceClient`](crate::client::ServiceClient)
//! with provider defaults and typed operations.

pub mod github;
pub mod google;
pub mod jobber;
pub mod sendgrid;
pub mod slack;

use std::sync::Arc;

use crate::client::ClientConfig;
use crate::error::ServiceResult;
use crate::service::ExternalService;

pub use github::GitHub;
pub use google::Google;
pub use jobber::Jobber;
pub use sendgrid::SendGrid;
pub use slack::Slack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum ServiceKind {
    Github,
    Slack,
    Sendgrid,
    Jobber,
    Google,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::Github,
        ServiceKind::Slack,
        ServiceKind::Sendgrid,
        ServiceKind::Jobber,
        ServiceKind::Google,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Github => github::NAME,
            ServiceKind::Slack => slack::NAME,
            ServiceKind::Sendgrid => sendgrid::NAME,
            ServiceKind::Jobber => jobber::NAME,
            ServiceKind::Google => google::NAME,
        }
    }

    /// Prefix of the `<PREFIX>_BASE_URL` / `<PREFIX>_TIMEOUT_MS` variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ServiceKind::Github => "GITHUB",
            ServiceKind::Slack => "SLACK",
            ServiceKind::Sendgrid => "SENDGRID",
            ServiceKind::Jobber => "JOBBER",
            ServiceKind::Google => "GOOGLE",
        }
    }

    pub fn token_var(&self) -> &'static str {
        match self {
            ServiceKind::Github => github::TOKEN_VAR,
            ServiceKind::Slack => slack::TOKEN_VAR,
            ServiceKind::Sendgrid => sendgrid::TOKEN_VAR,
            ServiceKind::Jobber => jobber::TOKEN_VAR,
            ServiceKind::Google => google::TOKEN_VAR,
        }
    }

    /// Provider defaults with the given token.
    pub fn default_config(&self, token: Option<String>) -> ClientConfig {
        match self {
            ServiceKind::Github => github::config(token),
            ServiceKind::Slack => slack::config(token),
            ServiceKind::Sendgrid => sendgrid::config(token),
            ServiceKind::Jobber => {
                jobber::config(token, jobber::VERSION_HEADER, jobber::DEFAULT_API_VERSION)
            }
            ServiceKind::Google => google::config(token, None),
        }
    }

    /// Builds the integration over the production transport.
    pub fn connect(&self, config: ClientConfig) -> ServiceResult<Arc<dyn ExternalService>> {
        Ok(match self {
            ServiceKind::Github => Arc::new(GitHub::new(config)?),
            ServiceKind::Slack => Arc::new(Slack::new(config)?),
            ServiceKind::Sendgrid => Arc::new(SendGrid::new(config)?),
            ServiceKind::Jobber => Arc::new(Jobber::new(config)?),
            ServiceKind::Google => Arc::new(Google::new(config)?),
        })
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
