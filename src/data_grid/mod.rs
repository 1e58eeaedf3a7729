//! Header and cell rendering on top of [`crate::sort_filter`].
//!
//! The grid keeps no state of its own: renderers read the sort/filter engine
//! through a [`GridContext`] and request changes by queueing actions, which the
//! engine applies once the render pass is over.

mod config;
mod engine;

use std::cell::RefCell;

pub use config::{CellRenderFn, CellTextFn, DataGridConfig, DataGridConfigMap, HeaderRenderFn};
pub use engine::{DataGridEngine, DataGridFactory};

use crate::error::GridResult;
use crate::sort_filter::{ColumnKey, FilteredBy, SortFilterAction, SortFilterEngine, SortedBy};

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderCell<R> {
    /// Plain text; the caller wires a click to [`GridContext::toggle_sort`].
    Label(String),
    Custom(R),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell<R> {
    Text(String),
    Custom(R),
}

impl<R> Cell<R> {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Custom(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedGrid<R> {
    pub columns: Vec<String>,
    pub headers: Vec<HeaderCell<R>>,
    pub rows: Vec<Vec<Cell<R>>>,
    /// Queued actions applied after this pass; non-zero means the grid is stale.
    pub applied: usize,
}

/// What a renderer sees: the sort/filter state, the column set, and an action queue.
pub struct GridContext<'a, K, T, R> {
    engine: &'a SortFilterEngine<K, T>,
    columns: &'a DataGridConfigMap<K, T, R>,
    queue: &'a RefCell<Vec<SortFilterAction<K>>>,
}

impl<'a, K: ColumnKey, T, R> GridContext<'a, K, T, R> {
    pub(crate) fn new(
        engine: &'a SortFilterEngine<K, T>,
        columns: &'a DataGridConfigMap<K, T, R>,
        queue: &'a RefCell<Vec<SortFilterAction<K>>>,
    ) -> Self {
        Self {
            engine,
            columns,
            queue,
        }
    }

    pub fn engine(&self) -> &'a SortFilterEngine<K, T> {
        self.engine
    }

    pub fn columns(&self) -> &'a DataGridConfigMap<K, T, R> {
        self.columns
    }

    pub fn filtered_by(&self) -> &'a [FilteredBy<K, T>] {
        self.engine.filtered_by()
    }

    pub fn sorted_by(&self) -> Option<&'a SortedBy<K, T>> {
        self.engine.sorted_by()
    }

    pub fn value_as_string(&self, key: K, row: &T) -> GridResult<String> {
        Ok(self.columns.config(&key)?.value_as_string(row))
    }

    /// Queues `action`; it runs after the current render pass.
    pub fn dispatch(&self, action: SortFilterAction<K>) {
        self.queue.borrow_mut().push(action);
    }

    pub fn toggle_sort(&self, key: K) {
        self.dispatch(SortFilterAction::ToggleSort(key));
    }
}
