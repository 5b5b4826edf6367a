//! ID generation and timestamp helpers.
//!
//! Uses `uuid::Uuid::now_v7()` for time-ordered ID generation with
//! entity-specific prefixes, and ISO 8601 UTC strings for all stored
//! timestamps.

use chrono::{DateTime, Utc};

/// Generate a prefixed UUID v7 ID.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::now_v7())
}

/// Get current UTC timestamp as an ISO 8601 string.
#[must_use]
pub fn now_iso() -> String {
    format_iso(Utc::now())
}

/// Format a UTC timestamp as an ISO 8601 string (second precision).
#[must_use]
pub fn format_iso(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse an ISO 8601 string into a UTC timestamp.
///
/// Accepts RFC 3339 with or without fractional seconds. Returns `None`
/// for malformed input.
#[must_use]
pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
