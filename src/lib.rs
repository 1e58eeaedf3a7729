//! Persisted sort/filter state for tabular views.
//!
//! [`sort_filter`] keeps a filter set and a sort state over an in-memory
//! collection and mirrors them into a cookie and/or the page query string.
//! [`data_grid`] adds per-column header and cell rendering on top. [`time`]
//! holds the duration, calendar and time-zone helpers the grid and its callers
//! format with.

pub mod config;
pub mod data_grid;
pub mod error;
pub mod positions;
pub mod sort_filter;
pub mod sync;
pub mod time;
pub mod utils;

pub use error::{GridError, GridResult};
