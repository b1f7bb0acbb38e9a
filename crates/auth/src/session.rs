use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed session lifetime.
pub const SESSION_TTL_HOURS: i64 = 12;

/// Length of a generated session token.
pub const SESSION_TOKEN_LEN: usize = 64;

pub fn default_session_ttl() -> Duration {
    Duration::hours(SESSION_TTL_HOURS)
}

/// Opaque, unguessable session identifier.
///
/// `Debug` is redacted so tokens do not leak into logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_TOKEN_LEN)
            .map(char::from)
            .collect();
        Self(token)
    }

    /// Wrap a token presented by a client. No format check is applied; unknown
    /// tokens simply fail to resolve.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionToken({prefix}…)")
    }
}

/// A persisted session row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub token: SessionToken,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        validate_session_window(self.created_at, self.expires_at, now).is_ok()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionValidationError {
    #[error("session has expired")]
    Expired,

    #[error("invalid session time window (expires_at <= created_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate a session's lifetime against `now`.
///
/// A session is live iff `now < expires_at`; the boundary instant is expired.
pub fn validate_session_window(
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), SessionValidationError> {
    if expires_at <= created_at {
        return Err(SessionValidationError::InvalidTimeWindow);
    }
    if now >= expires_at {
        return Err(SessionValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn generated_tokens_are_long_and_distinct() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_eq!(a.as_str().len(), SESSION_TOKEN_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn debug_output_is_redacted() {
        let token = SessionToken::from_raw("abcdefghijklmnop");
        assert_eq!(format!("{token:?}"), "SessionToken(abcdef…)");
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let created = t0();
        let expires = created + default_session_ttl();

        assert!(validate_session_window(created, expires, created).is_ok());
        assert!(validate_session_window(created, expires, expires - Duration::seconds(1)).is_ok());
        assert_eq!(
            validate_session_window(created, expires, expires),
            Err(SessionValidationError::Expired)
        );
    }

    #[test]
    fn rejects_inverted_window() {
        assert_eq!(
            validate_session_window(t0(), t0(), t0()),
            Err(SessionValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn ttl_is_twelve_hours() {
        assert_eq!(default_session_ttl(), Duration::hours(12));
    }
}
