use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use url::form_urlencoded;

use super::{apply_partial, capture, StateSync, SyncRecord};

/// Ordered query-string pairs with `URLSearchParams`-like editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

pub type SharedSearchParams = Arc<RwLock<SearchParams>>;

pub fn shared_search_params(query: &str) -> SharedSearchParams {
    Arc::new(RwLock::new(SearchParams::parse(query)))
}

impl SearchParams {
    /// Parses `a=1&b=x%2Cy`; a leading `?` is ignored.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            pairs: form_urlencoded::parse(query.as_bytes()).into_owned().collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Replaces the first occurrence of `key` and drops the others, or appends.
    pub fn set(&mut self, key: &str, value: &str) {
        let mut seen = false;
        self.pairs.retain_mut(|(k, v)| {
            if k != key {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            *v = value.to_string();
            true
        });
        if !seen {
            self.pairs.push((key.to_string(), value.to_string()));
        }
    }

    pub fn delete(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish();
        f.write_str(&encoded)
    }
}

/// Mirrors the managed keys into the page's query string.
pub struct SearchParamsSync {
    keys: Vec<String>,
    params: SharedSearchParams,
    stored_on_load: SyncRecord,
}

impl SearchParamsSync {
    pub fn new(keys: &[String], params: SharedSearchParams) -> Self {
        let stored_on_load = capture(&params.read(), keys);
        Self {
            keys: keys.to_vec(),
            params,
            stored_on_load,
        }
    }

    pub fn params(&self) -> &SharedSearchParams {
        &self.params
    }
}

impl StateSync for SearchParamsSync {
    fn name(&self) -> &'static str {
        "search_params"
    }

    fn stored_on_load(&self) -> &SyncRecord {
        &self.stored_on_load
    }

    fn update(&mut self, record: &SyncRecord) {
        let mut params = self.params.write();
        if apply_partial(&mut params, &self.keys, record) {
            log::debug!("sync.search_params.update query={}", *params);
        }
    }
}
