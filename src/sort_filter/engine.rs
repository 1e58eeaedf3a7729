use std::sync::Arc;

use super::{
    ColumnKey, FilteredBy, Predicate, SortFilterAction, SortFilterConfigMap, SortFilterOptions, SortOrder, SortValue,
    SortedBy, SORT_KEY_PARAM, SORT_ORDER_PARAM,
};
use crate::error::GridResult;
use crate::sync::{record_value, CookieSync, SearchParamsSync, StateSync, SyncEnv, SyncRecord};
use crate::utils::{non_empty, split_list};

/// Column definitions and options shared by every mounted engine.
pub struct SortFilterFactory<K, T> {
    config_map: Arc<SortFilterConfigMap<K, T>>,
    options: SortFilterOptions<K, T>,
    sync_keys: Vec<String>,
}

impl<K: ColumnKey, T> SortFilterFactory<K, T> {
    pub fn new(config_map: SortFilterConfigMap<K, T>, options: SortFilterOptions<K, T>) -> Self {
        let sync_keys = config_map.sync_keys();
        Self {
            config_map: Arc::new(config_map),
            options,
            sync_keys,
        }
    }

    pub fn config_map(&self) -> &Arc<SortFilterConfigMap<K, T>> {
        &self.config_map
    }

    pub fn options(&self) -> &SortFilterOptions<K, T> {
        &self.options
    }

    /// Keys the persistence adapters manage.
    pub fn sync_keys(&self) -> &[String] {
        &self.sync_keys
    }

    /// Creates the engine for one scope. Persisted state is read here and
    /// never again; the current state is written back immediately.
    pub fn mount(&self, data: Vec<T>, env: &SyncEnv) -> SortFilterEngine<K, T> {
        let sync = self.options.sync.as_ref();
        let cookie = sync.and_then(|s| CookieSync::new(s.cookie_key.as_deref(), &self.sync_keys, env.cookies.clone()));
        let search = sync
            .filter(|s| s.search_params)
            .map(|_| SearchParamsSync::new(&self.sync_keys, env.search_params.clone()));

        let stored = match (&cookie, &search) {
            (Some(c), _) => Some(c.stored_on_load()),
            (None, Some(s)) => Some(s.stored_on_load()),
            (None, None) => None,
        };

        let filtered_by = stored
            .map(|record| self.stored_filters(record))
            .filter(|filters| !filters.is_empty())
            .unwrap_or_else(|| self.options.default_filters.clone());
        let sorted_by = stored
            .and_then(|record| self.stored_sort(record))
            .or_else(|| self.options.default_sort.clone());

        let mut adapters: Vec<Box<dyn StateSync>> = Vec::new();
        if let Some(c) = cookie {
            adapters.push(Box::new(c));
        }
        if let Some(s) = search {
            adapters.push(Box::new(s));
        }

        let mut engine = SortFilterEngine {
            config_map: self.config_map.clone(),
            filtered_by,
            sorted_by,
            data,
            view: Vec::new(),
            view_revision: 0,
            adapters,
        };
        engine.recompute();
        engine.persist();
        log::debug!(
            "sort_filter.mount rows={} visible={} filters={} sort={} adapters={}",
            engine.data.len(),
            engine.view.len(),
            engine.filtered_by.len(),
            engine.sort_description(),
            engine.adapters.iter().map(|a| a.name()).collect::<Vec<_>>().join(",")
        );
        engine
    }

    fn stored_filters(&self, record: &SyncRecord) -> Vec<FilteredBy<K, T>> {
        self.config_map
            .iter()
            .filter_map(|(key, config)| {
                let raw = non_empty(Some(record_value(record, key.as_str())))?;
                Some(FilteredBy {
                    key,
                    config: config.clone(),
                    value: split_list(raw),
                })
            })
            .collect()
    }

    fn stored_sort(&self, record: &SyncRecord) -> Option<SortedBy<K, T>> {
        let key = self.config_map.resolve(record_value(record, SORT_KEY_PARAM))?;
        let order = SortOrder::parse(record_value(record, SORT_ORDER_PARAM))?;
        let config = self.config_map.get(&key)?.clone();
        Some(SortedBy { key, config, order })
    }
}

/// Sort/filter state of one mounted scope plus the derived view.
pub struct SortFilterEngine<K, T> {
    config_map: Arc<SortFilterConfigMap<K, T>>,
    filtered_by: Vec<FilteredBy<K, T>>,
    sorted_by: Option<SortedBy<K, T>>,
    data: Vec<T>,
    view: Vec<usize>,
    view_revision: u64,
    adapters: Vec<Box<dyn StateSync>>,
}

impl<K: ColumnKey, T> SortFilterEngine<K, T> {
    /// Upserts by key; the new entry goes first.
    pub fn filter_by(&mut self, entry: FilteredBy<K, T>) {
        self.filtered_by.retain(|f| f.key != entry.key);
        self.filtered_by.insert(0, entry);
        self.after_mutation();
    }

    pub fn filter_by_key(&mut self, key: K, value: Vec<String>) -> GridResult<()> {
        let entry = FilteredBy::new(&self.config_map, key, value)?;
        self.filter_by(entry);
        Ok(())
    }

    /// `None` clears every filter.
    pub fn clear_filtered_by(&mut self, key: Option<K>) {
        match key {
            Some(key) => self.filtered_by.retain(|f| f.key != key),
            None => self.filtered_by.clear(),
        }
        self.after_mutation();
    }

    pub fn sort_by(&mut self, next: SortedBy<K, T>) {
        self.sorted_by = Some(next);
        self.after_mutation();
    }

    pub fn sort_by_key(&mut self, key: K, order: SortOrder) -> GridResult<()> {
        let next = SortedBy::new(&self.config_map, key, order)?;
        self.sort_by(next);
        Ok(())
    }

    pub fn clear_sorted_by(&mut self) {
        self.sorted_by = None;
        self.after_mutation();
    }

    pub fn reset_sorting_filtering(&mut self) {
        self.filtered_by.clear();
        self.sorted_by = None;
        self.after_mutation();
    }

    /// Ascending on a new column, flipped on the current sort column. Columns
    /// without a sort function are left alone.
    pub fn toggle_sort(&mut self, key: K) -> GridResult<()> {
        let config = self.config_map.config(&key)?.clone();
        if !config.has_sort() {
            log::debug!("sort_filter.toggle_ignored key={}", key.as_str());
            return Ok(());
        }
        let order = match &self.sorted_by {
            Some(current) if current.key == key => current.order.toggled(),
            _ => SortOrder::Asc,
        };
        self.sort_by(SortedBy { key, config, order });
        Ok(())
    }

    pub fn dispatch(&mut self, action: SortFilterAction<K>) -> GridResult<()> {
        match action {
            SortFilterAction::FilterBy { key, value } => self.filter_by_key(key, value)?,
            SortFilterAction::ClearFilter(key) => {
                if let Some(key) = &key {
                    self.config_map.config(key)?;
                }
                self.clear_filtered_by(key);
            }
            SortFilterAction::SortBy { key, order } => self.sort_by_key(key, order)?,
            SortFilterAction::ToggleSort(key) => self.toggle_sort(key)?,
            SortFilterAction::ClearSort => self.clear_sorted_by(),
            SortFilterAction::Reset => self.reset_sorting_filtering(),
        }
        Ok(())
    }

    /// Replaces the unfiltered snapshot; state and adapters are untouched.
    pub fn set_data(&mut self, data: Vec<T>) {
        self.data = data;
        self.view_revision += 1;
        self.recompute();
    }

    pub fn filtered_by(&self) -> &[FilteredBy<K, T>] {
        &self.filtered_by
    }

    pub fn sorted_by(&self) -> Option<&SortedBy<K, T>> {
        self.sorted_by.as_ref()
    }

    pub fn unfiltered_data(&self) -> &[T] {
        &self.data
    }

    pub fn filtered_sorted_data(&self) -> Vec<&T> {
        self.iter_view().collect()
    }

    pub fn iter_view(&self) -> impl Iterator<Item = &T> + '_ {
        self.view.iter().map(move |&i| &self.data[i])
    }

    /// Positions into [`unfiltered_data`](Self::unfiltered_data), in display order.
    pub fn view_indices(&self) -> &[usize] {
        &self.view
    }

    /// Bumped whenever the derived view changes; equal revisions mean the
    /// same rows in the same order.
    pub fn view_revision(&self) -> u64 {
        self.view_revision
    }

    pub fn config_map(&self) -> &Arc<SortFilterConfigMap<K, T>> {
        &self.config_map
    }

    pub fn filter_value(&self, key: &K) -> Option<&[String]> {
        self.filtered_by
            .iter()
            .find(|f| f.key == *key)
            .map(|f| f.value.as_slice())
    }

    /// Filter candidates for `key` computed over the unfiltered data.
    pub fn options_for(&self, key: &K) -> GridResult<Vec<String>> {
        Ok(self.config_map.config(key)?.list_options(&self.data))
    }

    /// The state in adapter form: one comma-joined entry per active filter,
    /// plus the sort key and order.
    pub fn sync_record(&self) -> SyncRecord {
        let mut record: SyncRecord = self
            .filtered_by
            .iter()
            .map(|f| (f.key.as_str().to_string(), Some(f.value.join(","))))
            .collect();
        record.insert(
            SORT_KEY_PARAM.to_string(),
            self.sorted_by.as_ref().map(|s| s.key.as_str().to_string()),
        );
        record.insert(
            SORT_ORDER_PARAM.to_string(),
            self.sorted_by.as_ref().map(|s| s.order.as_str().to_string()),
        );
        record
    }

    fn after_mutation(&mut self) {
        self.recompute();
        self.persist();
    }

    fn persist(&mut self) {
        if self.adapters.is_empty() {
            return;
        }
        let record = self.sync_record();
        for adapter in self.adapters.iter_mut() {
            adapter.update(&record);
        }
    }

    fn recompute(&mut self) {
        let predicates: Vec<Predicate<T>> = self
            .filtered_by
            .iter()
            .filter_map(|f| {
                let predicate = f.config.predicate(&f.value);
                if predicate.is_none() {
                    log::warn!("sort_filter.filter_missing key={}", f.key.as_str());
                }
                predicate
            })
            .collect();

        let mut view: Vec<usize> = (0..self.data.len())
            .filter(|&i| predicates.iter().all(|p| p(&self.data[i])))
            .collect();

        if let Some(sorted) = &self.sorted_by {
            match self.config_map.get(&sorted.key).and_then(|c| c.sort_fn()) {
                None => log::warn!("sort_filter.sort_missing key={}", sorted.key.as_str()),
                Some(sort) => {
                    let mut keyed: Vec<(SortValue, usize)> =
                        view.iter().map(|&i| (sort(&self.data[i]), i)).collect();
                    keyed.sort_by(|a, b| a.0.compare(&b.0));
                    view = keyed.into_iter().map(|(_, i)| i).collect();
                    if sorted.order == SortOrder::Desc {
                        view.reverse();
                    }
                }
            }
        }

        if view != self.view {
            self.view = view;
            self.view_revision += 1;
        }
    }

    fn sort_description(&self) -> String {
        match &self.sorted_by {
            Some(s) => format!("{}:{}", s.key.as_str(), s.order),
            None => "none".to_string(),
        }
    }
}
