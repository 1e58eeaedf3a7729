use std::fmt;
use std::sync::Arc;

use super::{GridContext, HeaderCell};
use crate::error::{GridError, GridResult};
use crate::sort_filter::{ColumnKey, SortFilterConfig, SortFilterConfigMap, SortValue};

pub type HeaderRenderFn<K, T, R> = Arc<dyn Fn(K, &GridContext<'_, K, T, R>) -> HeaderCell<R> + Send + Sync>;
/// A custom cell; `None` falls back to the plain text cell.
pub type CellRenderFn<K, T, R> = Arc<dyn Fn(K, &T, &GridContext<'_, K, T, R>) -> Option<R> + Send + Sync>;
pub type CellTextFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// A sortable/filterable column plus how its header and cells render.
pub struct DataGridConfig<K, T, R> {
    sort_filter: SortFilterConfig<T>,
    th: Option<HeaderRenderFn<K, T, R>>,
    value_as: Option<CellRenderFn<K, T, R>>,
    value_as_string: CellTextFn<T>,
}

impl<K, T, R> Clone for DataGridConfig<K, T, R> {
    fn clone(&self) -> Self {
        Self {
            sort_filter: self.sort_filter.clone(),
            th: self.th.clone(),
            value_as: self.value_as.clone(),
            value_as_string: self.value_as_string.clone(),
        }
    }
}

impl<K, T, R> fmt::Debug for DataGridConfig<K, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataGridConfig")
            .field("sort_filter", &self.sort_filter)
            .field("th", &self.th.is_some())
            .field("value_as", &self.value_as.is_some())
            .finish()
    }
}

impl<K: ColumnKey, T: 'static, R: 'static> DataGridConfig<K, T, R> {
    pub fn new<F>(value_as_string: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            sort_filter: SortFilterConfig::new(),
            th: None,
            value_as: None,
            value_as_string: Arc::new(value_as_string),
        }
    }

    /// Header renderer. Without one the header is the label (or the key).
    pub fn th<F>(mut self, render: F) -> Self
    where
        F: Fn(K, &GridContext<'_, K, T, R>) -> HeaderCell<R> + Send + Sync + 'static,
    {
        self.th = Some(Arc::new(render));
        self
    }

    pub fn value_as<F>(mut self, render: F) -> Self
    where
        F: Fn(K, &T, &GridContext<'_, K, T, R>) -> Option<R> + Send + Sync + 'static,
    {
        self.value_as = Some(Arc::new(render));
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.sort_filter = self.sort_filter.label(label);
        self
    }

    pub fn sort<V, F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<SortValue>,
    {
        self.sort_filter = self.sort_filter.sort(f);
        self
    }

    pub fn filter<P, F>(mut self, f: F) -> Self
    where
        F: Fn(&[String]) -> P + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.sort_filter = self.sort_filter.filter(f);
        self
    }

    pub fn options<F>(mut self, f: F) -> Self
    where
        F: Fn(&[T]) -> Vec<Option<String>> + Send + Sync + 'static,
    {
        self.sort_filter = self.sort_filter.options(f);
        self
    }

    pub fn render_string_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.sort_filter = self.sort_filter.render_string_value(f);
        self
    }
}

impl<K, T, R> DataGridConfig<K, T, R> {
    pub fn sort_filter(&self) -> &SortFilterConfig<T> {
        &self.sort_filter
    }

    pub fn header_renderer(&self) -> Option<&HeaderRenderFn<K, T, R>> {
        self.th.as_ref()
    }

    pub fn cell_renderer(&self) -> Option<&CellRenderFn<K, T, R>> {
        self.value_as.as_ref()
    }

    pub fn value_as_string(&self, row: &T) -> String {
        (self.value_as_string)(row)
    }
}

/// Grid columns in display order.
pub struct DataGridConfigMap<K, T, R> {
    entries: Vec<(K, DataGridConfig<K, T, R>)>,
}

impl<K, T, R> Default for DataGridConfigMap<K, T, R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: fmt::Debug, T, R> fmt::Debug for DataGridConfigMap<K, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, c)| (k, c)))
            .finish()
    }
}

impl<K: ColumnKey, T, R> DataGridConfigMap<K, T, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: K, config: DataGridConfig<K, T, R>) -> Self {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = config,
            None => self.entries.push((key, config)),
        }
        self
    }

    pub fn get(&self, key: &K) -> Option<&DataGridConfig<K, T, R>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }

    pub fn config(&self, key: &K) -> GridResult<&DataGridConfig<K, T, R>> {
        self.get(key)
            .ok_or_else(|| GridError::UnknownKey(key.as_str().to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The sort/filter view of the same columns, sharing their functions.
    pub fn sort_filter_map(&self) -> SortFilterConfigMap<K, T> {
        let mut map = SortFilterConfigMap::new();
        for (key, config) in &self.entries {
            map.insert(*key, Arc::new(config.sort_filter.clone()));
        }
        map
    }
}
