use anyhow::{Context, Result};
use log::info;
use reqwest::Method;
use serde_json::Value;

use crate::client::{RequestOptions, ServiceResponse};
use crate::correlation::{self, RequestContext};
use crate::integrations::ServiceKind;
use crate::runtime::Runtime;

use super::config::load_config;

/// Performs a single call against a built-in service.
///
/// `request_id` propagates an existing correlation ID instead of generating one.
#[tracing::instrument(skip(runtime, data))]
pub async fn request<R: Runtime + ?Sized>(
    runtime: &R,
    kind: ServiceKind,
    method: &str,
    path: &str,
    data: Option<&str>,
    request_id: Option<&str>,
) -> Result<ServiceResponse<Value>> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method {:?}", method))?;
    let body = data
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--data is not valid JSON")?;
    let context = match request_id {
        Some(id) => correlation::resolve([(correlation::REQUEST_ID_HEADER, id)]),
        None => RequestContext::new(),
    };

    let service = kind
        .connect(load_config(runtime, kind)?)
        .with_context(|| format!("Failed to set up {}", kind))?;

    let result = service
        .call(method, path, body, RequestOptions::new().with_context(context))
        .await;
    service.destroy();

    let response = result?;
    info!(
        "{}: HTTP {} [request {}]",
        kind, response.status, response.correlation_id
    );
    Ok(response)
}
