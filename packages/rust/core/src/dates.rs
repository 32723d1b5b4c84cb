//! Date field normalization.
//!
//! Dates are written as ISO-8601 UTC instants with millisecond precision
//! (`2024-05-01T00:00:00.000Z`). Values that cannot be parsed are kept as they
//! arrived under the canonical key; there is no validation layer.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::warn;

use pressmark_shared::Properties;
use pressmark_shared::types::{DATE, PUBLISH_DATE, UPDATED, UPDATED_DATE};

/// Naive date-time layouts, interpreted as UTC.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Date-time layouts carrying a numeric offset without a colon (`+0800`).
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
];

/// Date-only layouts, interpreted as UTC midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

/// Format an instant the way every date property is written.
pub fn to_iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a property value into an instant.
///
/// Strings may be RFC 3339, RFC 2822, one of the layouts above, or a bare
/// year (`2024`) or year-month (`2024-05`); numbers are epoch milliseconds,
/// fractional ones truncated.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.and_utc());
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    if let Some(date) = parse_partial_iso(s) {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `YYYY` or `YYYY-MM`, anchored to the first day of the period.
fn parse_partial_iso(s: &str) -> Option<NaiveDate> {
    let all_digits = |part: &str, len: usize| {
        part.len() == len && part.bytes().all(|b| b.is_ascii_digit())
    };

    let (year, month) = match s.split_once('-') {
        Some((year, month)) if all_digits(year, 4) && all_digits(month, 2) => {
            (year, month.parse().ok()?)
        }
        None if all_digits(s, 4) => (s, 1),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, 1)
}

/// Ensure `publishDate` exists.
///
/// Legacy `date` wins over an existing `publishDate`; an existing
/// `publishDate` is re-parsed; otherwise `now` is used. A null or blank
/// `date` counts as absent and is removed rather than left beside
/// `publishDate`; the same holds for `updated` below.
pub(crate) fn normalize_publish_date(props: &mut Properties, now: DateTime<Utc>) {
    let value = match take_set(props, DATE) {
        Some(raw) => canonicalize(raw, DATE),
        None => match take_set(props, PUBLISH_DATE) {
            Some(raw) => canonicalize(raw, PUBLISH_DATE),
            None => Value::String(to_iso(now)),
        },
    };
    props.insert(PUBLISH_DATE.into(), value);
}

/// Move legacy `updated` into `updatedDate`.
///
/// An `updatedDate` without a legacy `updated` is left as it arrived.
pub(crate) fn normalize_updated_date(props: &mut Properties) {
    if let Some(raw) = take_set(props, UPDATED) {
        props.insert(UPDATED_DATE.into(), canonicalize(raw, UPDATED));
    }
}

/// Remove `key`, returning its value unless it was null or blank.
fn take_set(props: &mut Properties, key: &str) -> Option<Value> {
    props.shift_remove(key).filter(|value| match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

fn canonicalize(raw: Value, key: &str) -> Value {
    match parse_date(&raw) {
        Some(dt) => Value::String(to_iso(dt)),
        None => {
            warn!(key, value = %raw, "unparseable date, passing through unchanged");
            raw
        }
    }
}
