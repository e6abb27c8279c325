//! Time and timestamp helpers.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// UTC wall-clock timestamp used for readings, telemetry and preferences.
///
/// Control timing (occupancy debounce, cadences, backoff) uses monotonic
/// [`std::time::Instant`] instead.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Format a timestamp as fixed-width ISO-8601 (microseconds, `Z` suffix).
///
/// Fixed width keeps stored timestamps lexicographically sortable.
#[must_use]
pub fn to_iso8601(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// Accepts RFC 3339 with an offset, and the offset-less form devices emit
/// (`2025-04-20T12:34:56.789012`), which is taken to be UTC.
///
/// # Errors
///
/// Returns the chrono parse error when `value` matches neither form.
pub fn parse_iso8601(value: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .or_else(|err| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc())
                .map_err(|_| err)
        })
}
