use std::fmt;
use std::sync::Arc;

use super::{ColumnKey, SortValue, SORT_KEY_PARAM, SORT_ORDER_PARAM};
use crate::error::{GridError, GridResult};

pub type SortFn<T> = Arc<dyn Fn(&T) -> SortValue + Send + Sync>;
pub type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;
pub type FilterFn<T> = Arc<dyn Fn(&[String]) -> Predicate<T> + Send + Sync>;
pub type OptionsFn<T> = Arc<dyn Fn(&[T]) -> Vec<Option<String>> + Send + Sync>;
pub type RenderStringFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// How one column sorts, filters and lists its filter options. Every part is
/// optional; a column without `sort` cannot be sorted, one without `filter`
/// ignores filter values.
pub struct SortFilterConfig<T> {
    label: Option<String>,
    sort: Option<SortFn<T>>,
    filter: Option<FilterFn<T>>,
    options: Option<OptionsFn<T>>,
    render_string_value: Option<RenderStringFn>,
}

impl<T> Default for SortFilterConfig<T> {
    fn default() -> Self {
        Self {
            label: None,
            sort: None,
            filter: None,
            options: None,
            render_string_value: None,
        }
    }
}

impl<T> Clone for SortFilterConfig<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            sort: self.sort.clone(),
            filter: self.filter.clone(),
            options: self.options.clone(),
            render_string_value: self.render_string_value.clone(),
        }
    }
}

impl<T> fmt::Debug for SortFilterConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortFilterConfig")
            .field("label", &self.label)
            .field("sort", &self.sort.is_some())
            .field("filter", &self.filter.is_some())
            .field("options", &self.options.is_some())
            .field("render_string_value", &self.render_string_value.is_some())
            .finish()
    }
}

impl<T: 'static> SortFilterConfig<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn sort<V, F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<SortValue>,
    {
        self.sort = Some(Arc::new(move |row: &T| f(row).into()));
        self
    }

    /// `f` receives the selected values and returns the row predicate.
    pub fn filter<P, F>(mut self, f: F) -> Self
    where
        F: Fn(&[String]) -> P + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(move |values: &[String]| -> Predicate<T> {
            Box::new(f(values))
        }));
        self
    }

    pub fn options<F>(mut self, f: F) -> Self
    where
        F: Fn(&[T]) -> Vec<Option<String>> + Send + Sync + 'static,
    {
        self.options = Some(Arc::new(f));
        self
    }

    pub fn render_string_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.render_string_value = Some(Arc::new(f));
        self
    }
}

impl<T> SortFilterConfig<T> {
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn has_sort(&self) -> bool {
        self.sort.is_some()
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    pub fn sort_fn(&self) -> Option<&SortFn<T>> {
        self.sort.as_ref()
    }

    pub fn sort_value(&self, row: &T) -> Option<SortValue> {
        self.sort.as_ref().map(|f| f(row))
    }

    pub fn predicate(&self, values: &[String]) -> Option<Predicate<T>> {
        self.filter.as_ref().map(|f| f(values))
    }

    /// Candidate filter values for `rows`, without empty entries.
    pub fn list_options(&self, rows: &[T]) -> Vec<String> {
        let Some(options) = &self.options else {
            return Vec::new();
        };
        options(rows)
            .into_iter()
            .flatten()
            .filter(|o| !o.is_empty())
            .collect()
    }

    /// Display form of a selected filter value.
    pub fn render_string(&self, value: &str) -> String {
        match &self.render_string_value {
            Some(render) => render(value),
            None => value.to_string(),
        }
    }
}

/// Columns in declaration order, each key at most once.
pub struct SortFilterConfigMap<K, T> {
    entries: Vec<(K, Arc<SortFilterConfig<T>>)>,
}

impl<K, T> Default for SortFilterConfigMap<K, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Clone, T> Clone for SortFilterConfigMap<K, T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<K: fmt::Debug, T> fmt::Debug for SortFilterConfigMap<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, c)| (k, c)))
            .finish()
    }
}

impl<K: ColumnKey, T> SortFilterConfigMap<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: K, config: SortFilterConfig<T>) -> Self {
        self.insert(key, Arc::new(config));
        self
    }

    /// Adds a column, replacing an existing definition for the same key in place.
    pub fn insert(&mut self, key: K, config: Arc<SortFilterConfig<T>>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = config,
            None => self.entries.push((key, config)),
        }
    }

    pub fn get(&self, key: &K) -> Option<&Arc<SortFilterConfig<T>>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }

    /// Like [`get`](Self::get), but a missing key is a wiring error.
    pub fn config(&self, key: &K) -> GridResult<&Arc<SortFilterConfig<T>>> {
        self.get(key)
            .ok_or_else(|| GridError::UnknownKey(key.as_str().to_string()))
    }

    /// Closed-set lookup of a persisted key name.
    pub fn resolve(&self, name: &str) -> Option<K> {
        self.entries
            .iter()
            .map(|(k, _)| *k)
            .find(|k| k.as_str() == name)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &Arc<SortFilterConfig<T>>)> + '_ {
        self.entries.iter().map(|(k, c)| (*k, c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every column key in order, then `sortkey` and `sortorder`.
    pub fn sync_keys(&self) -> Vec<String> {
        self.keys()
            .map(|k| k.as_str().to_string())
            .chain([SORT_KEY_PARAM.to_string(), SORT_ORDER_PARAM.to_string()])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Row {
        name: String,
        qty: i64,
    }

    fn row(name: &str, qty: i64) -> Row {
        Row {
            name: name.to_string(),
            qty,
        }
    }

    #[test]
    fn builder_sets_capabilities() {
        let cfg = SortFilterConfig::<Row>::new()
            .label("Quantity")
            .sort(|r| r.qty)
            .filter(|v| {
                let min: i64 = v.first().and_then(|s| s.parse().ok()).unwrap_or(0);
                move |r: &Row| r.qty >= min
            });
        assert_eq!(cfg.label_text(), Some("Quantity"));
        assert!(cfg.has_sort());
        assert!(cfg.has_filter());
        assert_eq!(cfg.sort_value(&row("a", 3)), Some(SortValue::Number(3.0)));
        let p = cfg.predicate(&["2".to_string()]).unwrap();
        assert!(p(&row("a", 3)));
        assert!(!p(&row("b", 1)));
    }

    #[test]
    fn options_drop_empty_entries() {
        let cfg = SortFilterConfig::<Row>::new()
            .options(|rows| rows.iter().map(|r| Some(r.name.clone())).chain([None]).collect());
        let rows = vec![row("a", 1), row("", 2), row("c", 3)];
        assert_eq!(cfg.list_options(&rows), vec!["a", "c"]);
        assert!(SortFilterConfig::<Row>::new().list_options(&rows).is_empty());
    }

    #[test]
    fn render_string_defaults_to_identity() {
        let plain = SortFilterConfig::<Row>::new();
        assert_eq!(plain.render_string("x"), "x");
        let upper = SortFilterConfig::<Row>::new().render_string_value(|s| s.to_uppercase());
        assert_eq!(upper.render_string("x"), "X");
    }

    #[test]
    fn map_keeps_order_and_replaces_in_place() {
        let map = SortFilterConfigMap::<&'static str, Row>::new()
            .with("name", SortFilterConfig::new())
            .with("qty", SortFilterConfig::new())
            .with("name", SortFilterConfig::new().label("Name"));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["name", "qty"]);
        assert_eq!(map.get(&"name").unwrap().label_text(), Some("Name"));
        assert_eq!(map.sync_keys(), vec!["name", "qty", "sortkey", "sortorder"]);
    }

    #[test]
    fn resolve_is_a_closed_set_check() {
        let map = SortFilterConfigMap::<&'static str, Row>::new().with("qty", SortFilterConfig::new());
        assert_eq!(map.resolve("qty"), Some("qty"));
        assert_eq!(map.resolve("price"), None);
        assert!(matches!(map.config(&"price"), Err(GridError::UnknownKey(k)) if k == "price"));
    }
}
