use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// ISO-8601 in UTC with millisecond precision: `2024-01-15T10:30:00.000Z`
pub fn format_iso(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Unix epoch seconds (possibly fractional) to ISO-8601
///
/// Sub-millisecond precision is truncated. Out-of-range values yield `None`.
pub fn epoch_seconds_to_iso(seconds: f64) -> Option<String> {
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).trunc();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(|dt| format_iso(&dt))
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Re-emit a textual timestamp as ISO-8601 UTC
///
/// Empty input yields `None`. Input that does not parse is passed through unchanged, so an odd
/// export value is still shown rather than lost.
pub fn normalize_timestamp(value: Option<&str>) -> Option<String> {
    let value = value.filter(|v| !v.is_empty())?;
    Some(parse_timestamp(value).map_or_else(|| value.to_string(), |dt| format_iso(&dt)))
}

/// Short absolute date for summaries: "Jan 15, 2024"
pub fn format_date_label(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%b %-d, %Y").to_string()
}
