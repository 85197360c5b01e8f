//! ISO-8601 timestamp parsing and formatting.
//!
//! Upstream feeds send timestamps such as `2025-10-15T22:29:47Z`, sometimes
//! with an explicit offset, fractional seconds or no zone at all. Everything is
//! normalized to UTC; naive values are taken to be UTC already.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serializer;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp, returning `None` when it cannot be understood.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse an optional timestamp; absent and unparseable values both give `None`.
pub fn parse_optional(value: Option<&str>) -> Option<DateTime<Utc>> {
    value.and_then(parse_iso8601)
}

/// Format as ISO-8601 with a `Z` suffix, e.g. `2025-10-15T22:29:47Z`.
pub fn format_iso8601(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// `serialize_with` helper for optional timestamps in API responses.
pub fn serialize_optional<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(dt) => serializer.serialize_str(&format_iso8601(dt)),
        None => serializer.serialize_none(),
    }
}
