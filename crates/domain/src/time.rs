//! Time and timestamp helpers.

use chrono::{DateTime, SecondsFormat, Utc};

/// UTC wall-clock timestamp attached to readings.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Render a timestamp as fixed-width RFC 3339 (microseconds, `Z` suffix).
///
/// The fixed width keeps lexical and chronological order identical, which
/// storage adapters rely on.
#[must_use]
pub fn to_storage_string(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp previously produced by [`to_storage_string`] (or any
/// RFC 3339 string).
///
/// # Errors
///
/// Returns the underlying [`chrono::ParseError`] when the text is not RFC 3339.
pub fn from_storage_string(text: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|ts| ts.to_utc())
}
