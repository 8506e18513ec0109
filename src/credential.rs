//! Credentials and the swappable slot a client reads them from.

use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    BearerToken,
    OAuthAccessToken,
}

/// A token authorizing calls to one external service.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceCredential {
    kind: CredentialKind,
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl ServiceCredential {
    pub fn bearer(value: impl Into<String>) -> Self {
        Self {
            kind: CredentialKind::BearerToken,
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn oauth(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            kind: CredentialKind::OAuthAccessToken,
            value: value.into(),
            expires_at,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Expired when `expires_at` is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// `Authorization` value for the given scheme, e.g. `Bearer abc`.
    pub fn header_value(&self, scheme: &str) -> String {
        if scheme.is_empty() {
            self.value.clone()
        } else {
            format!("{} {}", scheme, self.value)
        }
    }

    /// First and last four characters only, for debug logs.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.value.chars().collect();
        if chars.len() <= 8 {
            return "********".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}****{}", head, tail)
    }
}

impl std::fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("kind", &self.kind)
            .field("value", &self.masked())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Holds the current credential reference. Readers get an `Arc` snapshot;
/// replacement swaps the reference and never touches a snapshot in use.
#[derive(Debug, Default)]
pub struct CredentialSlot {
    current: RwLock<Option<Arc<ServiceCredential>>>,
}

impl CredentialSlot {
    pub fn new(credential: Option<ServiceCredential>) -> Self {
        Self {
            current: RwLock::new(credential.map(Arc::new)),
        }
    }

    pub fn snapshot(&self) -> Option<Arc<ServiceCredential>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, credential: Option<ServiceCredential>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = credential.map(Arc::new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let cred = ServiceCredential::bearer("t");
        assert!(!cred.is_expired_at(now));

        let past = ServiceCredential::bearer("t").with_expiry(now - Duration::seconds(1));
        assert!(past.is_expired_at(now));

        let future = ServiceCredential::oauth("t", Some(now + Duration::hours(1)));
        assert!(!future.is_expired_at(now));
        assert_eq!(future.kind(), CredentialKind::OAuthAccessToken);
    }

    #[test]
    fn test_header_value() {
        let cred = ServiceCredential::bearer("abc");
        assert_eq!(cred.header_value("Bearer"), "Bearer abc");
        assert_eq!(cred.header_value("token"), "token abc");
        assert_eq!(cred.header_value(""), "abc");
    }

    #[test]
    fn test_debug_masks_secret() {
        let cred = ServiceCredential::bearer("ghp_1234567890abcdef");
        let dbg = format!("{:?}", cred);
        assert!(!dbg.contains("1234567890"));
        assert!(dbg.contains("ghp_****cdef"));

        assert_eq!(ServiceCredential::bearer("short").masked(), "********");
    }

    #[test]
    fn test_slot_swap_does_not_affect_snapshot() {
        let slot = CredentialSlot::new(Some(ServiceCredential::bearer("old")));
        let in_flight = slot.snapshot().unwrap();

        slot.replace(Some(ServiceCredential::bearer("new")));

        assert_eq!(in_flight.value(), "old");
        assert_eq!(slot.snapshot().unwrap().value(), "new");

        slot.replace(None);
        assert!(slot.snapshot().is_none());
    }
}
