//! Timestamp parsing for persisted and imported records.
//!
//! Stored timestamps are RFC 3339 strings. Imported feeds also hand us
//! trailing-`Z`, offset-less, and date-only values. A value that cannot be
//! parsed is a [`CoreError::MalformedTimestamp`]; callers that read records
//! recover from it by treating the timestamp as absent.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{CoreError, Result};

/// Parse a timestamp string into UTC.
///
/// Offset-less values are taken to be UTC. Date-only values map to midnight UTC.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(CoreError::MalformedTimestamp {
        field,
        value: value.to_string(),
    })
}

/// Parse an optional timestamp, recovering from malformed values.
///
/// A malformed value is logged and treated as absent, so an unreadable
/// checkpoint never produces damage.
pub fn parse_timestamp_lenient(field: &'static str, value: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = value?;
    if raw.trim().is_empty() {
        return None;
    }
    match parse_timestamp(field, raw) {
        Ok(dt) => Some(dt),
        Err(err) => {
            tracing::warn!(%err, "treating malformed timestamp as absent");
            None
        }
    }
}
