//! Free-text time-window parsing (spec §4.7): `"last two weeks"`,
//! `"yesterday"`, `"in March 2024"`, `"2024-03-01"`, and friends, resolved
//! to a half-open `(start_epoch, end_epoch)` pair anchored at a caller-
//! supplied "now".
//!
//! No expression found ⇒ a wide 5-year window (the all-time default at the
//! query layer); author-specific phrasing defaults to 90 days; risk-specific
//! phrasing defaults to 2 years.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

const SECONDS_PER_DAY: i64 = 86_400;
const MONTH_DAYS: i64 = 30;

/// Resolved time window, both bounds in Unix epoch seconds. `start <= end`
/// always holds (spec §8 invariant 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_epoch: i64,
    pub end_epoch: i64,
}

impl TimeWindow {
    fn new(start_epoch: i64, end_epoch: i64) -> Self {
        if start_epoch <= end_epoch {
            TimeWindow { start_epoch, end_epoch }
        } else {
            TimeWindow { start_epoch: end_epoch, end_epoch: start_epoch }
        }
    }
}

fn word_to_n(word: &str) -> Option<i64> {
    match word.to_ascii_lowercase().as_str() {
        "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        "nine" => Some(9),
        "ten" => Some(10),
        _ => word.parse::<i64>().ok(),
    }
}

fn unit_seconds(unit: &str) -> i64 {
    match unit.trim_end_matches('s').to_ascii_lowercase().as_str() {
        "day" => SECONDS_PER_DAY,
        "week" => 7 * SECONDS_PER_DAY,
        "month" => MONTH_DAYS * SECONDS_PER_DAY,
        "year" => 365 * SECONDS_PER_DAY,
        _ => SECONDS_PER_DAY,
    }
}

fn start_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc()
}

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    const NAMES: &[(&str, &str, u32)] = &[
        ("january", "jan", 1),
        ("february", "feb", 2),
        ("march", "mar", 3),
        ("april", "apr", 4),
        ("may", "may", 5),
        ("june", "jun", 6),
        ("july", "jul", 7),
        ("august", "aug", 8),
        ("september", "sep", 9),
        ("october", "oct", 10),
        ("november", "nov", 11),
        ("december", "dec", 12),
    ];
    NAMES.iter().find(|(full, abbr, _)| lower == *full || lower == *abbr).map(|(_, _, n)| *n)
}

fn last_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\blast\s+(\d+|one|two|three|four|five|six|seven|eight|nine|ten)\s+(day|days|week|weeks|month|months|year|years)\b").unwrap()
    })
}

fn last_single_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blast\s+(day|week|month|year)\b").unwrap())
}

fn this_period_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bthis\s+(week|month|year)\b").unwrap())
}

fn in_month_year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bin\s+([A-Za-z]{3,9})\s+(\d{4})\b").unwrap()
    })
}

fn mdy_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap())
}

fn iso_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap())
}

fn author_specific_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(changes?\s+(made|done)\s+by|prs?\s+(by|from)|\w+'s\s+prs?)\b").unwrap()
    })
}

fn risk_specific_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(riskiest|most\s+risky|high\s+risk)\b").unwrap())
}

/// Parses `query` against `now`, falling back to the author/risk/all-time
/// defaults per spec §4.7 when no explicit expression is found.
pub fn parse_window(query: &str, now: DateTime<Utc>) -> TimeWindow {
    if let Some(window) = parse_explicit(query, now) {
        return window;
    }

    let end = now.timestamp();
    if author_specific_regex().is_match(query) {
        tracing::debug!(query, "time parser: author-specific default (90d)");
        TimeWindow::new(end - 90 * SECONDS_PER_DAY, end)
    } else if risk_specific_regex().is_match(query) {
        tracing::debug!(query, "time parser: risk-specific default (2y)");
        TimeWindow::new(end - 2 * 365 * SECONDS_PER_DAY, end)
    } else {
        tracing::debug!(query, "time parser: no expression found, all-time default (5y)");
        TimeWindow::new(end - 5 * 365 * SECONDS_PER_DAY, end)
    }
}

fn parse_explicit(query: &str, now: DateTime<Utc>) -> Option<TimeWindow> {
    let end = now.timestamp();

    if let Some(caps) = last_regex().captures(query) {
        let n = word_to_n(&caps[1])?;
        let seconds = n * unit_seconds(&caps[2]);
        return Some(TimeWindow::new(end - seconds, end));
    }

    if let Some(caps) = last_single_regex().captures(query) {
        let seconds = unit_seconds(&caps[1]);
        return Some(TimeWindow::new(end - seconds, end));
    }

    if query.to_ascii_lowercase().contains("yesterday") {
        let today_start = start_of_day(now);
        let yesterday_start = today_start - Duration::days(1);
        return Some(TimeWindow::new(yesterday_start.timestamp(), today_start.timestamp()));
    }

    if query.to_ascii_lowercase().contains("today") {
        return Some(TimeWindow::new(start_of_day(now).timestamp(), end));
    }

    if let Some(caps) = this_period_regex().captures(query) {
        let period = caps[1].to_ascii_lowercase();
        let start = match period.as_str() {
            "week" => {
                let today = now.date_naive();
                let back = today.weekday().num_days_from_monday();
                let monday = today - Duration::days(back as i64);
                monday.and_hms_opt(0, 0, 0).unwrap().and_utc()
            }
            "month" => {
                NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    .and_utc()
            }
            _ => NaiveDate::from_ymd_opt(now.year(), 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap().and_utc(),
        };
        return Some(TimeWindow::new(start.timestamp(), end));
    }

    if let Some(caps) = in_month_year_regex().captures(query) {
        let month = month_from_name(&caps[1])?;
        let year: i32 = caps[2].parse().ok()?;
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next_month_start = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let start_ts = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let end_ts = next_month_start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        return Some(TimeWindow::new(start_ts, end_ts));
    }

    if let Some(caps) = iso_date_regex().captures(query) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return day_window(year, month, day);
    }

    if let Some(caps) = mdy_regex().captures(query) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return day_window(year, month, day);
    }

    None
}

fn day_window(year: i32, month: u32, day: u32) -> Option<TimeWindow> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let start = date.and_hms_opt(0, 0, 0)?.and_utc();
    let end = start + Duration::days(1);
    Some(TimeWindow::new(start.timestamp(), end.timestamp()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap()
    }

    #[test]
    fn last_n_weeks_parses_word_numbers() {
        let w = parse_window("What was shipped last two weeks?", now());
        assert_eq!(w.end_epoch, now().timestamp());
        assert_eq!(w.start_epoch, now().timestamp() - 14 * SECONDS_PER_DAY);
    }

    #[test]
    fn last_single_unit_defaults_to_one() {
        let w = parse_window("last week", now());
        assert_eq!(w.start_epoch, now().timestamp() - 7 * SECONDS_PER_DAY);
    }

    #[test]
    fn yesterday_is_prior_calendar_day() {
        let w = parse_window("yesterday", now());
        let today_start = start_of_day(now()).timestamp();
        assert_eq!(w.end_epoch, today_start);
        assert_eq!(w.start_epoch, today_start - SECONDS_PER_DAY);
    }

    #[test]
    fn this_week_starts_monday() {
        let w = parse_window("this week", now());
        let start_date = DateTime::from_timestamp(w.start_epoch, 0).unwrap();
        assert_eq!(start_date.weekday(), Weekday::Mon);
    }

    #[test]
    fn in_month_year_is_calendar_bounded() {
        let w = parse_window("in March 2024", now());
        let start = DateTime::from_timestamp(w.start_epoch, 0).unwrap();
        let end = DateTime::from_timestamp(w.end_epoch, 0).unwrap();
        assert_eq!((start.year(), start.month(), start.day()), (2024, 3, 1));
        assert_eq!((end.year(), end.month(), end.day()), (2024, 4, 1));
    }

    #[test]
    fn month_abbreviation_recognized() {
        let w = parse_window("in Mar 2024", now());
        let start = DateTime::from_timestamp(w.start_epoch, 0).unwrap();
        assert_eq!(start.month(), 3);
    }

    #[test]
    fn iso_date_is_single_day_window() {
        let w = parse_window("changes on 2024-03-15", now());
        assert_eq!(w.end_epoch - w.start_epoch, SECONDS_PER_DAY);
    }

    #[test]
    fn mdy_date_is_single_day_window() {
        let w = parse_window("changes on 03/15/2024", now());
        assert_eq!(w.end_epoch - w.start_epoch, SECONDS_PER_DAY);
    }

    #[test]
    fn no_expression_defaults_to_five_years() {
        let w = parse_window("top files by risk", now());
        assert_eq!(w.start_epoch, now().timestamp() - 5 * 365 * SECONDS_PER_DAY);
    }

    #[test]
    fn author_specific_defaults_to_ninety_days() {
        let w = parse_window("changes made by alice", now());
        assert_eq!(w.start_epoch, now().timestamp() - 90 * SECONDS_PER_DAY);
    }

    #[test]
    fn risk_specific_defaults_to_two_years() {
        let w = parse_window("riskiest files", now());
        assert_eq!(w.start_epoch, now().timestamp() - 2 * 365 * SECONDS_PER_DAY);
    }

    #[test]
    fn monotonic_in_n_for_last_n_days() {
        let small = parse_window("last 3 days", now());
        let large = parse_window("last 9 days", now());
        assert!(large.start_epoch <= small.start_epoch);
        assert!(small.end_epoch >= small.start_epoch);
        assert!(large.end_epoch >= large.start_epoch);
    }
}
