use thiserror::Error;

use crate::time::TimeError;

/// Wiring mistakes and I/O failures surfaced by the grid library.
///
/// Malformed persisted state is never reported here; it is recovered to an
/// empty default where it is read.
#[derive(Error, Debug)]
pub enum GridError {
    /// A column key that is not part of the config map.
    #[error("Unknown column key: {0:?}")]
    UnknownKey(String),

    #[error("Invalid sort order {0:?} (expected asc|desc)")]
    InvalidSortOrder(String),

    /// A `key=values` / `key:order` string that does not split.
    #[error("Malformed column spec {0:?}")]
    MalformedSpec(String),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GridResult<T> = std::result::Result<T, GridError>;
