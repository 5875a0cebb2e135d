use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::ValueRef;

/// Seconds between 1970-01-01 and the chat store's 2001-01-01 epoch.
pub const PLATFORM_EPOCH_OFFSET_SECS: i64 = 978_307_200;

fn parse_text(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.timestamp());
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(naive.and_utc().timestamp());
        }
    }
    let day = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()?;
    Some(day.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

/// Shifts seconds counted from the platform epoch onto the Unix epoch
/// and formats them as RFC 3339 UTC.
pub fn format_shifted(seconds: i64) -> Option<String> {
    let unix = seconds.checked_add(PLATFORM_EPOCH_OFFSET_SECS)?;
    let at = DateTime::<Utc>::from_timestamp(unix, 0)?;
    Some(at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Converts a stored message date. Text is parsed as a date-time whose
/// Unix seconds still count from the platform epoch; numbers are that
/// seconds count directly. Anything else yields `None`.
pub fn convert(value: ValueRef<'_>) -> Option<String> {
    let seconds = match value {
        ValueRef::Null | ValueRef::Blob(_) => return None,
        ValueRef::Integer(v) => v,
        ValueRef::Real(v) if v.is_finite() => v.trunc() as i64,
        ValueRef::Real(_) => return None,
        ValueRef::Text(bytes) => parse_text(std::str::from_utf8(bytes).ok()?)?,
    };
    format_shifted(seconds)
}
