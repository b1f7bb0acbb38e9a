//! Timestamp encoding for persisted rows.
//!
//! Timestamps are stored as fixed-width RFC3339 strings in UTC (microsecond
//! precision, `Z` suffix). With a fixed width, string order equals time order,
//! so range predicates such as `expires_at <= ?` can run in SQL directly.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::DomainError;

/// Encode a timestamp for storage.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a timestamp previously written by [`format_timestamp`].
///
/// Any RFC3339 offset is accepted and normalized to UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::validation(format!("invalid timestamp '{raw}': {e}")))
}
