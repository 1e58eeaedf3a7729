use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;

use super::{calendar::parse_date_like, TimeError};

pub const NY_TIME_ZONE: &str = "America/New_York";
pub const INVALID_DATE: &str = "NaN-NaN-NaN";
pub const INVALID_TIME: &str = "NaN:NaN:NaN";

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";
const TIME_MS_FMT: &str = "%H:%M:%S%.3f";

const QUARTER_HOUR_MINUTES: i64 = 15;
// Candidate offsets in quarter hours, ascending: -13:00 ..= +14:00.
const MIN_OFFSET_QUARTERS: i32 = -13 * 4;
// One hour past the usual +13:00 bound so Pacific/Kiritimati resolves.
const MAX_OFFSET_QUARTERS: i32 = 14 * 4;
const GUESS_WINDOW_QUARTERS: i32 = 2 * 4;

static ZONE_FORMATTING_WORKS: LazyLock<bool> = LazyLock::new(|| {
    let Ok(tz) = NY_TIME_ZONE.parse::<Tz>() else {
        return false;
    };
    let Some(reference) = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).single() else {
        return false;
    };
    reference.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string() == "1999-12-31 19:00:00"
});

/// Self-test of the zone database: midnight UTC on 2000-01-01 must read as
/// 19:00 the previous day in New York.
pub fn zone_formatting_works() -> bool {
    *ZONE_FORMATTING_WORKS
}

/// `YYYY-MM-DD` only (four-digit year, month 01-12, day 01-31).
pub fn is_strict_date_string(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        return false;
    };
    let two_digits_in = |x: &str, hi: u32| {
        x.len() == 2 && x.parse::<u32>().map(|v| (1..=hi).contains(&v)).unwrap_or(false)
    };
    year.len() == 4
        && year.bytes().all(|b| b.is_ascii_digit())
        && two_digits_in(month, 12)
        && two_digits_in(day, 31)
}

fn strict_date(naive: &NaiveDateTime) -> String {
    let formatted = naive.format(DATE_FMT).to_string();
    if is_strict_date_string(&formatted) {
        formatted
    } else {
        INVALID_DATE.to_string()
    }
}

fn time_of_day(naive: &NaiveDateTime, no_ms: bool) -> String {
    naive
        .format(if no_ms { TIME_FMT } else { TIME_MS_FMT })
        .to_string()
}

pub fn to_utc_date(at: &DateTime<Utc>) -> String {
    strict_date(&at.naive_utc())
}

/// UTC `(YYYY-MM-DD, HH:MM:SS.sss)`, or `HH:MM:SS` when `no_ms` is set.
pub fn to_utc_date_and_time(at: &DateTime<Utc>, no_ms: bool) -> (String, String) {
    let naive = at.naive_utc();
    (strict_date(&naive), time_of_day(&naive, no_ms))
}

/// Formats instants as wall-clock date/time in one IANA zone.
///
/// When the zone database fails its self-test the formatter degrades to UTC and
/// reports `is_zone_aware() == false`; callers must accept UTC output then.
#[derive(Debug, Clone)]
pub struct ZonedFormatter {
    zone_name: String,
    zone: Option<Tz>,
}

impl ZonedFormatter {
    pub fn new(zone: &str) -> Result<Self, TimeError> {
        Self::build(zone, zone_formatting_works())
    }

    fn build(zone: &str, formatting_works: bool) -> Result<Self, TimeError> {
        let tz: Tz = zone
            .trim()
            .parse()
            .map_err(|_| TimeError::UnknownZone(zone.to_string()))?;
        if !formatting_works {
            log::warn!("time.zone_formatting_degraded zone={} fallback=utc", zone);
            return Ok(Self {
                zone_name: tz.name().to_string(),
                zone: None,
            });
        }
        Ok(Self {
            zone_name: tz.name().to_string(),
            zone: Some(tz),
        })
    }

    pub fn utc() -> Self {
        Self {
            zone_name: "UTC".to_string(),
            zone: None,
        }
    }

    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    pub fn is_zone_aware(&self) -> bool {
        self.zone.is_some()
    }

    /// Wall-clock time of `at` in this zone.
    pub fn local_naive(&self, at: &DateTime<Utc>) -> NaiveDateTime {
        match &self.zone {
            Some(tz) => at.with_timezone(tz).naive_local(),
            None => at.naive_utc(),
        }
    }

    pub fn to_date(&self, at: &DateTime<Utc>) -> String {
        strict_date(&self.local_naive(at))
    }

    pub fn to_date_and_time(&self, at: &DateTime<Utc>, no_ms: bool) -> (String, String) {
        let naive = self.local_naive(at);
        (strict_date(&naive), time_of_day(&naive, no_ms))
    }

    /// Offset in effect at the instant `at`. Unlike [`OffsetResolver`] this
    /// never reads a wall clock, so DST gaps and repeated hours are exact.
    pub fn utc_offset_at(&self, at: &DateTime<Utc>) -> String {
        format_offset_minutes((self.local_naive(at) - at.naive_utc()).num_minutes())
    }
}

fn format_offset(quarters: i32) -> String {
    format_offset_minutes(i64::from(quarters) * QUARTER_HOUR_MINUTES)
}

fn format_offset_minutes(minutes: i64) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let minutes = minutes.abs();
    format!("UTC{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

/// Finds a zone's UTC offset at an instant by probing candidate offsets.
///
/// The offset `o` is the one for which the wall clock of `at - o` in the zone
/// equals `at` read as UTC. Candidates are scanned in ascending order. Each zone
/// remembers the last offset found; the next lookup scans `[found - 2h, found + 2h)`
/// first and falls back to the full range when the window has no match.
#[derive(Debug, Default)]
pub struct OffsetResolver {
    formatters: Mutex<HashMap<String, ZonedFormatter>>,
    last_found: Mutex<HashMap<String, i32>>,
}

impl OffsetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn formatter(&self, zone: &str) -> Result<ZonedFormatter, TimeError> {
        let mut formatters = self.formatters.lock();
        if let Some(f) = formatters.get(zone) {
            return Ok(f.clone());
        }
        let f = ZonedFormatter::new(zone)?;
        formatters.insert(zone.to_string(), f.clone());
        Ok(f)
    }

    /// Offset in quarter hours (e.g. -16 for UTC-04:00).
    pub fn offset_quarters(&self, at: &DateTime<Utc>, zone: &str) -> Result<i32, TimeError> {
        let formatter = self.formatter(zone)?;
        let target = at.naive_utc();
        let matches = |quarters: &i32| {
            let shift = TimeDelta::minutes(i64::from(*quarters) * QUARTER_HOUR_MINUTES);
            at.checked_sub_signed(shift)
                .is_some_and(|probe| formatter.local_naive(&probe) == target)
        };

        let guess = self.last_found.lock().get(zone).copied();
        let found = guess
            .and_then(|prev| {
                let lo = (prev - GUESS_WINDOW_QUARTERS).max(MIN_OFFSET_QUARTERS);
                let hi = (prev + GUESS_WINDOW_QUARTERS).min(MAX_OFFSET_QUARTERS + 1);
                (lo..hi).find(matches)
            })
            .or_else(|| (MIN_OFFSET_QUARTERS..=MAX_OFFSET_QUARTERS).find(matches))
            .ok_or_else(|| TimeError::OffsetNotFound {
                zone: zone.to_string(),
                at: *at,
            })?;

        self.last_found.lock().insert(zone.to_string(), found);
        Ok(found)
    }

    /// `UTC+HH:MM` / `UTC-HH:MM` for the zone at `at`.
    pub fn utc_offset(&self, at: &DateTime<Utc>, zone: &str) -> Result<String, TimeError> {
        self.offset_quarters(at, zone).map(format_offset)
    }

    pub fn forget(&self, zone: &str) {
        self.last_found.lock().remove(zone);
    }
}

/// Uncached offset lookup for a date string (see [`parse_date_like`]).
pub fn utc_offset(reference: &str, zone: &str) -> Result<String, TimeError> {
    let at = parse_date_like(reference).ok_or_else(|| TimeError::InvalidDate(reference.to_string()))?;
    OffsetResolver::new().utc_offset(&at, zone)
}
