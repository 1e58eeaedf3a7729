use std::sync::LazyLock;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;

use super::TimeError;

pub const ONE_SECOND_MS: i64 = 1000;
pub const ONE_MINUTE_MS: i64 = 60 * ONE_SECOND_MS;
pub const ONE_HOUR_MS: i64 = 60 * ONE_MINUTE_MS;
pub const ONE_DAY_MS: i64 = 24 * ONE_HOUR_MS;
pub const ONE_WEEK_MS: i64 = 7 * ONE_DAY_MS;
pub const ONE_MONTH_MS: i64 = 30 * ONE_DAY_MS;
pub const ONE_YEAR_MS: i64 = 365 * ONE_DAY_MS;
pub const FOREVER_MS: i64 = 1000 * ONE_YEAR_MS;

static TIME_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(ms|s|m|h|d|w|mo|y)$").expect("time-like regex"));

/// A duration given either as raw milliseconds or as a shorthand like `"5m"`.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeLike {
    Millis(f64),
    Text(String),
}

impl From<f64> for TimeLike {
    fn from(ms: f64) -> Self {
        TimeLike::Millis(ms)
    }
}

impl From<i64> for TimeLike {
    fn from(ms: i64) -> Self {
        TimeLike::Millis(ms as f64)
    }
}

impl From<&str> for TimeLike {
    fn from(s: &str) -> Self {
        TimeLike::Text(s.to_string())
    }
}

impl From<String> for TimeLike {
    fn from(s: String) -> Self {
        TimeLike::Text(s)
    }
}

fn unit_ms(unit: &str) -> Option<i64> {
    match unit {
        "ms" => Some(1),
        "s" => Some(ONE_SECOND_MS),
        "m" => Some(ONE_MINUTE_MS),
        "h" => Some(ONE_HOUR_MS),
        "d" => Some(ONE_DAY_MS),
        "w" => Some(ONE_WEEK_MS),
        "mo" => Some(ONE_MONTH_MS),
        "y" => Some(ONE_YEAR_MS),
        _ => None,
    }
}

/// Milliseconds for a time-like value, NaN when the text does not parse.
pub fn time_like_to_ms(time: impl Into<TimeLike>) -> f64 {
    match time.into() {
        TimeLike::Millis(ms) => ms,
        TimeLike::Text(s) => {
            let Some(caps) = TIME_LIKE_RE.captures(&s) else {
                return f64::NAN;
            };
            let Ok(value) = caps[1].parse::<f64>() else {
                return f64::NAN;
            };
            unit_ms(&caps[2]).map_or(f64::NAN, |unit| value * unit as f64)
        }
    }
}

pub fn is_time_like(time: impl Into<TimeLike>) -> bool {
    !time_like_to_ms(time).is_nan()
}

fn checked_ms(time: TimeLike) -> Result<i64, TimeError> {
    let raw = match &time {
        TimeLike::Millis(ms) => ms.to_string(),
        TimeLike::Text(s) => s.clone(),
    };
    let ms = time_like_to_ms(time);
    if !ms.is_finite() {
        return Err(TimeError::InvalidDuration(raw));
    }
    if ms.abs() > i64::MAX as f64 {
        return Err(TimeError::OutOfRange);
    }
    Ok(ms as i64)
}

pub(crate) fn shift_back(
    now: DateTime<Utc>,
    time: impl Into<TimeLike>,
) -> Result<DateTime<Utc>, TimeError> {
    let ms = checked_ms(time.into())?;
    let delta = TimeDelta::try_milliseconds(ms).ok_or(TimeError::OutOfRange)?;
    now.checked_sub_signed(delta).ok_or(TimeError::OutOfRange)
}

pub(crate) fn shift_forward(
    now: DateTime<Utc>,
    time: impl Into<TimeLike>,
) -> Result<DateTime<Utc>, TimeError> {
    let ms = checked_ms(time.into())?;
    let delta = TimeDelta::try_milliseconds(ms).ok_or(TimeError::OutOfRange)?;
    now.checked_add_signed(delta).ok_or(TimeError::OutOfRange)
}

/// The instant `time` before now.
pub fn some_time_ago(time: impl Into<TimeLike>) -> Result<DateTime<Utc>, TimeError> {
    shift_back(Utc::now(), time)
}

pub fn some_time_ago_ms(time: impl Into<TimeLike>) -> Result<i64, TimeError> {
    some_time_ago(time).map(|d| d.timestamp_millis())
}

/// The instant `time` after now.
pub fn in_some_time(time: impl Into<TimeLike>) -> Result<DateTime<Utc>, TimeError> {
    shift_forward(Utc::now(), time)
}

pub fn in_some_time_ms(time: impl Into<TimeLike>) -> Result<i64, TimeError> {
    in_some_time(time).map(|d| d.timestamp_millis())
}
