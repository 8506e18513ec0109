//! HTTP plumbing: header list, transport trait and status classification.

mod classify;
mod headers;
mod transport;

pub use classify::{StatusClass, classify_status};
pub use headers::Headers;
#[cfg(test)]
pub use transport::MockTransport;
#[cfg(test)]
pub(crate) use transport::tests::capture_one_request;
pub use transport::{
    OutboundRequest, ReqwestTransport, Transport, TransportError, TransportFailure,
    TransportResponse,
};
