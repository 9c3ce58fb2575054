//! Date normalization for scraped review timestamps.
//!
//! Review sites render dates in several shapes: absolute dates
//! (`"Mar 3, 2024"`, `"2024-03-03"`), relative dates (`"3 days ago"`), and
//! edited reviews prefixed with `"Updated"`. [`normalize_date`] maps all of
//! them onto a [`ReviewDate`].
//!
//! # Rules (applied in order)
//!
//! 1. Empty input → [`ReviewDate::Undated`].
//! 2. `"Updated <rest>"` (case-insensitive) → normalize `<rest>`.
//! 3. `"<N> day(s) ago"` → `now - N days`.
//! 4. A recognized calendar-date format → that instant (midnight UTC for
//!    date-only formats).
//! 5. Anything else → [`ReviewDate::Undated`].
//!
//! The function never fails and never reads the system clock: `now` is
//! supplied by the caller so one analysis pass sees one consistent "now".

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::models::ReviewDate;

/// Date-only formats tried after the timestamp formats, in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%m/%d/%Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn updated_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^updated\s+(.+)$").expect("static regex"))
}

fn days_ago_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(\d+)\s+days?\s+ago$").expect("static regex"))
}

/// Normalize a raw date string relative to a fixed `now`.
pub fn normalize_date(raw: &str, now: DateTime<Utc>) -> ReviewDate {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ReviewDate::Undated;
    }

    if let Some(caps) = updated_re().captures(trimmed) {
        return normalize_date(&caps[1], now);
    }

    if let Some(caps) = days_ago_re().captures(trimmed) {
        return caps[1]
            .parse::<i64>()
            .ok()
            .and_then(Duration::try_days)
            .and_then(|offset| now.checked_sub_signed(offset))
            .map(ReviewDate::Dated)
            .unwrap_or(ReviewDate::Undated);
    }

    match parse_calendar_date(trimmed) {
        Some(dt) => ReviewDate::Dated(dt),
        None => ReviewDate::Undated,
    }
}

/// Generic calendar-date parse over the formats scrapers are known to emit.
pub fn parse_calendar_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn empty_is_undated() {
        assert_eq!(normalize_date("", now()), ReviewDate::Undated);
        assert_eq!(normalize_date("   ", now()), ReviewDate::Undated);
    }

    #[test]
    fn days_ago_counts_back_from_now() {
        let expected = now() - Duration::days(3);
        assert_eq!(normalize_date("3 days ago", now()), ReviewDate::Dated(expected));
        assert_eq!(
            normalize_date("1 day ago", now()),
            ReviewDate::Dated(now() - Duration::days(1))
        );
        assert_eq!(normalize_date("0 Days Ago", now()), ReviewDate::Dated(now()));
    }

    #[test]
    fn updated_prefix_recurses() {
        assert_eq!(
            normalize_date("Updated Mar 3, 2024", now()),
            ReviewDate::Dated(day(2024, 3, 3))
        );
        assert_eq!(
            normalize_date("UPDATED 2 days ago", now()),
            ReviewDate::Dated(now() - Duration::days(2))
        );
    }

    #[test]
    fn standard_formats_parse() {
        assert_eq!(
            normalize_date("2024-05-01", now()),
            ReviewDate::Dated(day(2024, 5, 1))
        );
        assert_eq!(
            normalize_date("2024-05-01T10:30:00Z", now()),
            ReviewDate::Dated(Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap())
        );
        assert_eq!(
            normalize_date("February 29, 2024", now()),
            ReviewDate::Dated(day(2024, 2, 29))
        );
        assert_eq!(
            normalize_date("12/25/2023", now()),
            ReviewDate::Dated(day(2023, 12, 25))
        );
    }

    #[test]
    fn unrecognized_strings_are_undated() {
        for raw in ["yesterday", "Updated", "sometime in May", "2024-13-45", "a day ago"] {
            assert_eq!(normalize_date(raw, now()), ReviewDate::Undated, "{raw}");
        }
    }

    #[test]
    fn absurd_day_offsets_are_undated() {
        assert_eq!(
            normalize_date("99999999999999999999 days ago", now()),
            ReviewDate::Undated
        );
    }

    #[test]
    fn normalization_is_pure_for_fixed_now() {
        let a = normalize_date("5 days ago", now());
        let b = normalize_date("5 days ago", now());
        assert_eq!(a, b);
    }
}
