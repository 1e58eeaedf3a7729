use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{ColumnKey, SortFilterConfig, SortFilterConfigMap, SortOrder};
use crate::error::GridResult;

/// One active filter: the column, its config and the selected values.
pub struct FilteredBy<K, T> {
    pub key: K,
    pub config: Arc<SortFilterConfig<T>>,
    pub value: Vec<String>,
}

impl<K: ColumnKey, T> FilteredBy<K, T> {
    pub fn new(map: &SortFilterConfigMap<K, T>, key: K, value: Vec<String>) -> GridResult<Self> {
        Ok(Self {
            key,
            config: map.config(&key)?.clone(),
            value,
        })
    }
}

impl<K: Clone, T> Clone for FilteredBy<K, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            config: self.config.clone(),
            value: self.value.clone(),
        }
    }
}

impl<K: fmt::Debug, T> fmt::Debug for FilteredBy<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredBy")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

impl<K: PartialEq, T> PartialEq for FilteredBy<K, T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

/// The active sort column and direction.
pub struct SortedBy<K, T> {
    pub key: K,
    pub config: Arc<SortFilterConfig<T>>,
    pub order: SortOrder,
}

impl<K: ColumnKey, T> SortedBy<K, T> {
    pub fn new(map: &SortFilterConfigMap<K, T>, key: K, order: SortOrder) -> GridResult<Self> {
        Ok(Self {
            key,
            config: map.config(&key)?.clone(),
            order,
        })
    }
}

impl<K: Clone, T> Clone for SortedBy<K, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            config: self.config.clone(),
            order: self.order,
        }
    }
}

impl<K: fmt::Debug, T> fmt::Debug for SortedBy<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedBy")
            .field("key", &self.key)
            .field("order", &self.order)
            .finish()
    }
}

impl<K: PartialEq, T> PartialEq for SortedBy<K, T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.order == other.order
    }
}

/// Where the sort/filter state is persisted. With no sync options at all the
/// state lives only as long as the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Cookie name; `None` disables the cookie backend.
    pub cookie_key: Option<String>,
    pub search_params: bool,
}

pub struct SortFilterOptions<K, T> {
    /// Used when nothing usable was persisted.
    pub default_filters: Vec<FilteredBy<K, T>>,
    pub default_sort: Option<SortedBy<K, T>>,
    pub sync: Option<SyncOptions>,
}

impl<K, T> Default for SortFilterOptions<K, T> {
    fn default() -> Self {
        Self {
            default_filters: Vec::new(),
            default_sort: None,
            sync: None,
        }
    }
}

impl<K: Clone, T> Clone for SortFilterOptions<K, T> {
    fn clone(&self) -> Self {
        Self {
            default_filters: self.default_filters.clone(),
            default_sort: self.default_sort.clone(),
            sync: self.sync.clone(),
        }
    }
}

impl<K: fmt::Debug, T> fmt::Debug for SortFilterOptions<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortFilterOptions")
            .field("default_filters", &self.default_filters)
            .field("default_sort", &self.default_sort)
            .field("sync", &self.sync)
            .finish()
    }
}

/// A state change requested by a control or a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortFilterAction<K> {
    FilterBy { key: K, value: Vec<String> },
    /// `None` clears every filter.
    ClearFilter(Option<K>),
    SortBy { key: K, order: SortOrder },
    /// Header click: ascending on a new column, flipped on the current one.
    ToggleSort(K),
    ClearSort,
    Reset,
}
