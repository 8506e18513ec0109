//! Transport abstraction over the actual HTTP stack.

use async_trait::async_trait;
use log::debug;
use reqwest::{
    Client, Method, Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::headers::Headers;

/// A fully built outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

/// Raw response as seen by the transport. Any status code is a response;
/// classification happens in the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }
}

/// Why a request never produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportFailure {
    /// The request did not complete within its timeout.
    Timeout,
    /// Connection refused, reset, DNS failure or other I/O error.
    Connection,
    /// The transport was closed via `destroy`.
    Closed,
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportFailure::Timeout => write!(f, "timed out"),
            TransportFailure::Connection => write!(f, "connection failed"),
            TransportFailure::Closed => write!(f, "transport closed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportFailure,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request. Implementations must not retry.
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError>;

    /// Releases pooled connections. Safe to call more than once.
    fn close(&self);
}

/// Production transport backed by a pooled `reqwest::Client`.
pub struct ReqwestTransport {
    client: Mutex<Option<Client>>,
}

impl ReqwestTransport {
    /// Creates a new transport wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self {
            client: Mutex::new(Some(client)),
        }
    }

    /// Builds the default client: rustls, given user agent, optional HTTP/1
    /// title-case header names.
    ///
    /// reqwest normalizes header names to lowercase, so the casing stored in
    /// [`Headers`] does not reach the wire. `title_case_headers` is the only
    /// casing control available: `X-JOBBER-GRAPHQL-VERSION` goes out as
    /// `X-Jobber-Graphql-Version`.
    pub fn build(user_agent: &str, title_case_headers: bool) -> reqwest::Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent.to_string());
        if title_case_headers {
            builder = builder.http1_title_case_headers();
        }
        Ok(Self::new(builder.build()?))
    }

    fn client(&self) -> Option<Client> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let client = self
            .client()
            .ok_or_else(|| TransportError::new(TransportFailure::Closed, "client destroyed"))?;

        let headers = to_header_map(&request.headers)?;
        let mut builder = client
            .request(request.method, request.url)
            .headers(headers)
            .timeout(request.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(n, v)| v.to_str().ok().map(|v| (n.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(classify_reqwest_error)?
            .to_vec();

        debug!("HTTP {} ({} bytes)", status, body.len());

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }

    fn close(&self) {
        let dropped = self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if dropped.is_some() {
            debug!("Closed HTTP connection pool");
        }
    }
}

fn to_header_map(headers: &Headers) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            TransportError::new(
                TransportFailure::Connection,
                format!("invalid header name {:?}: {}", name, e),
            )
        })?;
        let mut value = HeaderValue::from_str(value).map_err(|e| {
            TransportError::new(
                TransportFailure::Connection,
                format!("invalid value for header {}: {}", name, e),
            )
        })?;
        if name == reqwest::header::AUTHORIZATION {
            value.set_sensitive(true);
        }
        map.insert(name, value);
    }
    Ok(map)
}

fn classify_reqwest_error(error: reqwest::Error) -> TransportError {
    let kind = if error.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Connection
    };
    TransportError::new(kind, error.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mockito::Matcher;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::task::JoinHandle;

    /// Listens on a loopback port for one request, answers `200 {}` and
    /// yields the raw request (head and body) exactly as received.
    pub(crate) async fn capture_one_request() -> (String, JoinHandle<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
                )
                .await
                .unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let Some(head_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&raw[..head_end]).to_ascii_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= head_end + 4 + body_len
    }

    fn outbound(url: &str, path: &str) -> OutboundRequest {
        OutboundRequest {
            method: Method::GET,
            url: Url::parse(&format!("{}{}", url, path)).unwrap(),
            headers: Headers::new(),
            body: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_send_passes_headers_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/items")
            .match_header("x-request-id", "abc")
            .match_header("authorization", "Bearer t")
            .match_body(Matcher::Exact(r#"{"a":1}"#.to_string()))
            .with_status(201)
            .with_header("x-trace", "t1")
            .with_body(r#"{"id":7}"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        let mut request = outbound(&server.url(), "/items");
        request.method = Method::POST;
        request.headers.set("X-Request-Id", "abc");
        request.headers.set("Authorization", "Bearer t");
        request.body = Some(br#"{"a":1}"#.to_vec());

        let response = transport.send(request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 201);
        assert_eq!(response.body, br#"{"id":7}"#.to_vec());
        assert_eq!(response.headers.get("X-Trace"), Some("t1"));
    }

    #[tokio::test]
    async fn test_send_returns_error_statuses_as_responses() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(503)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Client::new());
        let response = transport.send(outbound(&server.url(), "/")).await.unwrap();

        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn test_send_connection_refused() {
        // Port 9 (discard) on localhost is not expected to be listening.
        let transport = ReqwestTransport::new(Client::new());
        let err = transport
            .send(outbound("http://127.0.0.1:9", "/"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, TransportFailure::Connection);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_send() {
        let transport = ReqwestTransport::new(Client::new());
        transport.close();
        transport.close();

        let err = transport
            .send(outbound("http://127.0.0.1:9", "/"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, TransportFailure::Closed);
    }

    #[tokio::test]
    async fn test_title_case_header_names_on_the_wire() {
        let (url, captured) = capture_one_request().await;
        let transport = ReqwestTransport::build("svcgate-test", true).unwrap();
        let mut request = outbound(&url, "/graphql");
        request.headers.set("X-JOBBER-GRAPHQL-VERSION", "2025-01-20");

        let response = transport.send(request).await.unwrap();
        let raw = captured.await.unwrap();

        assert_eq!(response.status, 200);
        assert!(
            raw.contains("\r\nX-Jobber-Graphql-Version: 2025-01-20\r\n"),
            "{}",
            raw
        );
    }

    #[tokio::test]
    async fn test_header_names_are_lowercase_by_default() {
        let (url, captured) = capture_one_request().await;
        let transport = ReqwestTransport::build("svcgate-test", false).unwrap();
        let mut request = outbound(&url, "/graphql");
        request.headers.set("X-JOBBER-GRAPHQL-VERSION", "2025-01-20");

        transport.send(request).await.unwrap();
        let raw = captured.await.unwrap();

        assert!(
            raw.contains("\r\nx-jobber-graphql-version: 2025-01-20\r\n"),
            "{}",
            raw
        );
    }

    #[test]
    fn test_to_header_map_rejects_bad_names() {
        let mut headers = Headers::new();
        headers.set("bad header", "x");
        assert!(to_header_map(&headers).is_err());
    }

    #[test]
    fn test_to_header_map_marks_authorization_sensitive() {
        let mut headers = Headers::new();
        headers.set("Authorization", "Bearer secret");
        let map = to_header_map(&headers).unwrap();
        assert!(map.get("authorization").unwrap().is_sensitive());
    }
}
