use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Utc, Weekday};
use regex::Regex;

static CALENDAR_SHIFT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(d|mo|y)$").expect("calendar shift regex"));

/// Parses the date shapes exports and query strings carry: RFC 3339, a naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` read as UTC, or a bare `YYYY-MM-DD` at UTC midnight.
pub fn parse_date_like(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// UTC midnight of (year, zero-based month, day), normalising overflowing
/// months and days into neighbouring months/years.
fn utc_midnight(year: i64, month0: i64, day: i64) -> Option<DateTime<Utc>> {
    let year = year + month0.div_euclid(12);
    let month = month0.rem_euclid(12) as u32 + 1;
    let first = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, 1)?;
    let date = first.checked_add_signed(TimeDelta::try_days(day - 1)?)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn shift_calendar(d: &DateTime<Utc>, timelike: &str, sign: i64) -> Option<DateTime<Utc>> {
    let caps = CALENDAR_SHIFT_RE.captures(timelike)?;
    let value: i64 = caps[1].parse().ok()?;
    let value = value.checked_mul(sign)?;
    let (years, months, days) = match &caps[2] {
        "y" => (value, 0, 0),
        "mo" => (0, value, 0),
        _ => (0, 0, value),
    };
    utc_midnight(
        i64::from(d.year()).checked_add(years)?,
        i64::from(d.month0()).checked_add(months)?,
        i64::from(d.day()).checked_add(days)?,
    )
}

/// Adds `Nd`, `Nmo` or `Ny` on the UTC calendar; the result is at UTC midnight.
/// `None` for any other shorthand.
pub fn plus(d: &DateTime<Utc>, timelike: &str) -> Option<DateTime<Utc>> {
    shift_calendar(d, timelike, 1)
}

pub fn minus(d: &DateTime<Utc>, timelike: &str) -> Option<DateTime<Utc>> {
    shift_calendar(d, timelike, -1)
}

/// Latest of the given dates, skipping missing ones.
pub fn date_max<I>(dates: I) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = Option<DateTime<Utc>>>,
{
    dates.into_iter().flatten().max()
}

/// Earliest of the given dates, skipping missing ones.
pub fn date_min<I>(dates: I) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = Option<DateTime<Utc>>>,
{
    dates.into_iter().flatten().min()
}

pub fn is_weekend(d: &DateTime<Utc>) -> bool {
    matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn is_weekday(d: &DateTime<Utc>) -> bool {
    !is_weekend(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_supported_shapes() {
        assert_eq!(
            parse_date_like("2023-06-15T12:00:00Z"),
            Some(Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date_like("2023-06-15T08:00:00-04:00"),
            Some(Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date_like("2023-06-15T12:00:00.250"),
            Some(Utc.timestamp_millis_opt(1_686_830_400_250).unwrap())
        );
        assert_eq!(parse_date_like("2023-06-15"), Some(day(2023, 6, 15)));
        assert_eq!(parse_date_like("invalid-date"), None);
        assert_eq!(parse_date_like("2023-13-01"), None);
    }

    #[test]
    fn plus_days_months_years() {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 15, 30, 0).unwrap();
        assert_eq!(plus(&base, "5d"), Some(day(2025, 1, 6)));
        assert_eq!(plus(&base, "2mo"), Some(day(2025, 3, 1)));
        assert_eq!(plus(&base, "1y"), Some(day(2026, 1, 1)));
        assert_eq!(plus(&base, "10x"), None);
        assert_eq!(plus(&base, "5m"), None);
    }

    #[test]
    fn minus_crosses_year_boundaries() {
        let base = day(2025, 1, 1);
        assert_eq!(minus(&base, "5d"), Some(day(2024, 12, 27)));
        assert_eq!(minus(&base, "2mo"), Some(day(2024, 11, 1)));
        assert_eq!(minus(&base, "1y"), Some(day(2024, 1, 1)));
    }

    #[test]
    fn month_overflow_normalises_like_utc_constructor() {
        // Jan 31 + 1 month lands on Feb 31, which rolls into March.
        assert_eq!(plus(&day(2025, 1, 31), "1mo"), Some(day(2025, 3, 3)));
        assert_eq!(plus(&day(2024, 1, 31), "1mo"), Some(day(2024, 3, 2)));
        assert_eq!(plus(&day(2024, 11, 15), "14mo"), Some(day(2026, 1, 15)));
    }

    #[test]
    fn max_and_min_skip_missing() {
        let dates = vec![
            parse_date_like("2025-01-01"),
            None,
            parse_date_like("invalid"),
            parse_date_like("2024-12-31"),
            parse_date_like("2025-02-01"),
        ];
        assert_eq!(date_max(dates.clone()), Some(day(2025, 2, 1)));
        assert_eq!(date_min(dates), Some(day(2024, 12, 31)));
        assert_eq!(date_max(vec![None, None]), None);
    }

    #[test]
    fn weekend_detection() {
        assert!(is_weekend(&day(2024, 3, 30)));
        assert!(is_weekend(&day(2024, 3, 31)));
        assert!(is_weekday(&day(2024, 4, 1)));
    }
}
