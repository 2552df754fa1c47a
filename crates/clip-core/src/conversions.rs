//! Lenient field conversions used when turning raw rows into records.
//!
//! None of these functions fail: malformed input maps to `0` or `None` so a
//! single bad cell never aborts a run.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde_json::Value;

// ── Integers ──────────────────────────────────────────────────────────────────

/// Parse the leading integer of `s`.
///
/// Surrounding whitespace is ignored, an optional sign is honoured and
/// parsing stops at the first non-digit. Text without leading digits yields
/// `0`; values beyond `i64` saturate.
///
/// # Examples
///
/// ```
/// use clip_core::conversions::to_int;
///
/// assert_eq!(to_int("42"), 42);
/// assert_eq!(to_int(" 12.7 "), 12);
/// assert_eq!(to_int("-3"), -3);
/// assert_eq!(to_int("abc"), 0);
/// assert_eq!(to_int(""), 0);
/// ```
pub fn to_int(s: &str) -> i64 {
    let trimmed = s.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if negative {
        -value
    } else {
        value
    }
}

/// Integer view of a JSON cell: numbers are truncated, strings go through
/// [`to_int`], everything else is `0`.
pub fn value_to_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => to_int(s),
        _ => 0,
    }
}

/// String view of a JSON cell. `null` and containers become `""`.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

// ── Months ────────────────────────────────────────────────────────────────────

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Calendar date of a day string, or `None` when unparsable.
///
/// Timestamps with an offset keep the calendar date as written rather than
/// converting it to another zone.
pub fn parse_day(day: &str) -> Option<NaiveDate> {
    let s = day.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// `"YYYY-MM"` month key for a day string.
///
/// # Examples
///
/// ```
/// use clip_core::conversions::month_key;
///
/// assert_eq!(month_key("2024-03-05").as_deref(), Some("2024-03"));
/// assert_eq!(month_key("2024-12-31T23:59:59Z").as_deref(), Some("2024-12"));
/// assert_eq!(month_key("yesterday"), None);
/// ```
pub fn month_key(day: &str) -> Option<String> {
    parse_day(day).map(|d| format!("{:04}-{:02}", d.year(), d.month()))
}
