//! Upload dates as the site renders them ("3d ago", "2-15", "2023-2-15").

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// Format used for the exported `Upload Date` column.
pub const ISO_FORMAT: &str = "%Y-%m-%d";

fn relative_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d+)\s*([a-z]+)\s+ago$").expect("valid relative date regex")
    })
}

/// Resolve a rendered upload date against `today`.
///
/// An `author · date` byline is accepted; only the part after the last `·`
/// is read. Returns `None` when nothing recognisable is left.
pub fn parse_upload_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.rsplit('·').next().unwrap_or(text).trim();
    if text.is_empty() {
        return None;
    }

    if let Some(cap) = relative_regex().captures(text) {
        let amount: i64 = cap[1].parse().ok().filter(|n| *n <= 100_000)?;
        let unit = cap[2].to_ascii_lowercase();
        let back = match unit.as_str() {
            "w" | "wk" | "wks" | "week" | "weeks" => Duration::weeks(amount),
            "d" | "day" | "days" => Duration::days(amount),
            "mo" | "month" | "months" => Duration::days(amount * 30),
            "y" | "yr" | "year" | "years" => Duration::days(amount * 365),
            "s" | "sec" | "secs" | "second" | "seconds" | "m" | "min" | "mins" | "minute"
            | "minutes" | "h" | "hr" | "hrs" | "hour" | "hours" => Duration::zero(),
            _ => return None,
        };
        return today.checked_sub_signed(back);
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, ISO_FORMAT) {
        return Some(date);
    }

    // month-day of the current year, or last year if that is still ahead
    let with_year = format!("{}-{}", today.year(), text);
    let date = NaiveDate::parse_from_str(&with_year, ISO_FORMAT).ok()?;
    if date > today {
        date.with_year(today.year() - 1)
    } else {
        Some(date)
    }
}

/// Serial of 9999-12-31, the last day Excel can show.
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Date from an Excel serial day number (1900 date system).
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL + 1.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::try_days(serial.floor() as i64)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_relative_dates() {
        assert_eq!(parse_upload_date("3d ago", today()), ymd(2024, 6, 17));
        assert_eq!(parse_upload_date("2w ago", today()), ymd(2024, 6, 6));
        assert_eq!(parse_upload_date("5h ago", today()), ymd(2024, 6, 20));
        assert_eq!(parse_upload_date("10m ago", today()), ymd(2024, 6, 20));
        assert_eq!(parse_upload_date("2 months ago", today()), ymd(2024, 4, 21));
        assert_eq!(parse_upload_date("1 week ago", today()), ymd(2024, 6, 13));
    }

    #[test]
    fn test_full_and_partial_dates() {
        assert_eq!(parse_upload_date("2023-2-15", today()), ymd(2023, 2, 15));
        assert_eq!(parse_upload_date("2-15", today()), ymd(2024, 2, 15));
        // later in the year than today means last year
        assert_eq!(parse_upload_date("12-24", today()), ymd(2023, 12, 24));
    }

    #[test]
    fn test_byline_prefix_is_stripped() {
        assert_eq!(
            parse_upload_date("shopqueen · 4d ago", today()),
            ymd(2024, 6, 16)
        );
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_upload_date("", today()), None);
        assert_eq!(parse_upload_date("N/A", today()), None);
        assert_eq!(parse_upload_date("yesterday-ish", today()), None);
    }

    #[test]
    fn test_excel_serial() {
        assert_eq!(from_excel_serial(45292.0), ymd(2024, 1, 1));
        assert_eq!(from_excel_serial(45292.75), ymd(2024, 1, 1));
        assert_eq!(from_excel_serial(0.0), None);
    }

    #[test]
    fn test_excel_serial_out_of_range() {
        assert_eq!(from_excel_serial(2_958_465.0), ymd(9999, 12, 31));
        assert_eq!(from_excel_serial(2_958_467.0), None);
        assert_eq!(from_excel_serial(1e15), None);
        assert_eq!(from_excel_serial(f64::MAX), None);
        assert_eq!(from_excel_serial(f64::NAN), None);
    }
}
