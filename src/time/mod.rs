//! Time helpers: duration shorthands, UTC calendar arithmetic, zone-aware
//! formatting and UTC offset lookup.
//!
//! Months and years in duration shorthands are fixed at 30 and 365 days. This is
//! a known approximation, not calendar arithmetic; use [`plus`]/[`minus`] when
//! whole calendar months are needed.

mod calendar;
mod duration;
mod zone;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use calendar::{date_max, date_min, is_weekday, is_weekend, minus, parse_date_like, plus};
pub use duration::{
    in_some_time, in_some_time_ms, is_time_like, some_time_ago, some_time_ago_ms,
    time_like_to_ms, TimeLike, FOREVER_MS, ONE_DAY_MS, ONE_HOUR_MS, ONE_MINUTE_MS, ONE_MONTH_MS,
    ONE_SECOND_MS, ONE_WEEK_MS, ONE_YEAR_MS,
};
pub use zone::{
    is_strict_date_string, to_utc_date, to_utc_date_and_time, utc_offset, zone_formatting_works,
    OffsetResolver, ZonedFormatter, INVALID_DATE, INVALID_TIME, NY_TIME_ZONE,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeError {
    #[error("Invalid time format: {0:?}")]
    InvalidDuration(String),

    #[error("Invalid date: {0:?}")]
    InvalidDate(String),

    #[error("Unknown time zone: {0:?}")]
    UnknownZone(String),

    /// No candidate offset reproduces the reference instant in the zone.
    #[error("No UTC offset found for zone {zone} at {at}")]
    OffsetNotFound { zone: String, at: DateTime<Utc> },

    #[error("Date out of range")]
    OutOfRange,
}
