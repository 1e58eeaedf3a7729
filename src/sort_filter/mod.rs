//! Generic sort/filter state over a typed column config map.
//!
//! A [`SortFilterFactory`] is built once from the column definitions; every scope
//! that shows the data mounts its own [`SortFilterEngine`], seeded from the
//! configured persistence adapters, and drops it with the scope.

mod config;
mod controls;
mod engine;
mod state;

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::GridError;

pub use config::{FilterFn, OptionsFn, Predicate, RenderStringFn, SortFilterConfig, SortFilterConfigMap, SortFn};
pub use controls::TextFilter;
pub use engine::{SortFilterEngine, SortFilterFactory};
pub use state::{FilteredBy, SortFilterAction, SortFilterOptions, SortedBy, SyncOptions};

/// Persistence key carrying the sorted column.
pub const SORT_KEY_PARAM: &str = "sortkey";
/// Persistence key carrying `asc` / `desc`.
pub const SORT_ORDER_PARAM: &str = "sortorder";

/// A column identifier. Implemented by the caller's key enum; `&'static str`
/// works for ad-hoc maps.
pub trait ColumnKey: Copy + Eq + Hash + fmt::Debug + 'static {
    fn as_str(&self) -> &'static str;
}

impl ColumnKey for &'static str {
    fn as_str(&self) -> &'static str {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::parse(s).ok_or_else(|| GridError::InvalidSortOrder(s.to_string()))
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key a row sorts by.
///
/// Numbers order before text; NaN orders after every other number; text
/// compares lexicographically.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Number(f64),
    Text(String),
}

impl SortValue {
    pub fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
            (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
        }
    }
}

macro_rules! sort_value_from_number {
    ($($t:ty),*) => {
        $(impl From<$t> for SortValue {
            fn from(v: $t) -> Self {
                SortValue::Number(v as f64)
            }
        })*
    };
}

sort_value_from_number!(f64, f32, i64, i32, u64, u32, usize);

impl From<String> for SortValue {
    fn from(v: String) -> Self {
        SortValue::Text(v)
    }
}

impl From<&str> for SortValue {
    fn from(v: &str) -> Self {
        SortValue::Text(v.to_string())
    }
}

impl From<&String> for SortValue {
    fn from(v: &String) -> Self {
        SortValue::Text(v.clone())
    }
}
