//! Display formatting shared by the dashboard views and the email preview.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Minutes of paralegal time one sent intake is assumed to save.
pub const MINUTES_SAVED_PER_INTAKE: u32 = 45;

/// Compact elapsed time: `"42s"`, `"3m 7s"`, `"2h 15m"`. Negative spans
/// count as zero.
pub fn format_elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let total_seconds = (to - from).num_seconds().max(0);
    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }
    let mins = total_seconds / 60;
    let secs = total_seconds % 60;
    if mins < 60 {
        return format!("{}m {}s", mins, secs);
    }
    format!("{}h {}m", mins / 60, mins % 60)
}

/// `"{m}m {s}s"` with minutes unbounded, as used for speed-to-lead.
pub fn format_minutes_seconds(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    format!("{}m {}s", total_seconds / 60, total_seconds % 60)
}

/// `"Xh Ym"`, `"Xh"` or `"Ym"` for the estimated time saved by `count`
/// sent intakes.
pub fn format_hours_saved(count: usize) -> String {
    let total_minutes = count as u64 * u64::from(MINUTES_SAVED_PER_INTAKE);
    let hours = total_minutes / 60;
    let mins = total_minutes % 60;
    match (hours, mins) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Parses the loose date strings the extraction pipeline produces: a bare
/// ISO date, an RFC 3339 timestamp, or a naive ISO date-time.
pub fn parse_loose_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// `"Mar 5, 2026"`; unparseable input is returned as-is.
pub fn format_date(value: &str) -> String {
    match parse_loose_date(value) {
        Some(date) => date.format("%b %-d, %Y").to_string(),
        None => value.to_string(),
    }
}

/// First whitespace-separated token of the client's name, or `"Client"`.
pub fn first_name(full_name: Option<&str>) -> String {
    full_name
        .and_then(|name| name.split_whitespace().next())
        .unwrap_or("Client")
        .to_string()
}
