//! Time-window predicates over media server dates.
//!
//! Dates that are missing or cannot be parsed resolve to [`SENTINEL`], a
//! point in the distant past: it never falls within a window and is always
//! outside one.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

pub const SENTINEL: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// Parses the date formats the media server emits.
///
/// Accepts RFC 3339 (the server sends seven fractional digits), naive
/// date-times taken as UTC, and bare `YYYY-MM-DD` dates taken as midnight UTC.
#[must_use]
pub fn parse_media_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Resolves an optional raw date, falling back to [`SENTINEL`].
#[must_use]
pub fn resolve_date(value: Option<&str>) -> DateTime<Utc> {
    value.and_then(parse_media_date).unwrap_or(SENTINEL)
}

fn cutoff(days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    TimeDelta::try_days(days.max(0))
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(SENTINEL)
}

/// True iff `date >= now - days`. The boundary itself is within.
#[must_use]
pub fn within_last_x_days(date: Option<&str>, days: i64, now: DateTime<Utc>) -> bool {
    let date = resolve_date(date);
    date != SENTINEL && date >= cutoff(days, now)
}

/// True iff `date < now - days`; the exact complement of [`within_last_x_days`].
#[must_use]
pub fn not_within_last_x_days(date: Option<&str>, days: i64, now: DateTime<Utc>) -> bool {
    !within_last_x_days(date, days, now)
}
