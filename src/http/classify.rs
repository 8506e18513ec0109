//! Status code classification.

/// Outcome category of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx
    Success,
    /// 401 and 403
    Authentication,
    /// Other 4xx, plus anything outside 2xx-5xx that reached us
    Client,
    /// 5xx
    Server,
}

/// Classifies a status code. Never retries, never inspects the body.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        401 | 403 => StatusClass::Authentication,
        500..=599 => StatusClass::Server,
        // 1xx/3xx are not followed here; treat them as a caller-side problem
        _ => StatusClass::Client,
    }
}
