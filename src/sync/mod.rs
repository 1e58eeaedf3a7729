//! Read-once/write-many mirrors of a flat string record.
//!
//! Both backends capture the managed keys once when constructed and afterwards
//! only write: every [`StateSync::update`] compares each managed key with what is
//! currently persisted and sets or deletes it, leaving every other key alone.

mod cookie;
mod search_params;

use std::collections::BTreeMap;

pub use cookie::{shared_cookie_jar, Cookie, CookieJar, CookieSync, SharedCookieJar, COOKIE_MAX_AGE};
pub use search_params::{shared_search_params, SearchParams, SearchParamsSync, SharedSearchParams};

/// Flat persisted record; `None` means absent.
pub type SyncRecord = BTreeMap<String, Option<String>>;

pub trait StateSync {
    /// Short backend name used in log lines.
    fn name(&self) -> &'static str;

    /// Values of the managed keys as they were when the adapter was created.
    fn stored_on_load(&self) -> &SyncRecord;

    /// Writes the managed keys of `record` through to the store.
    fn update(&mut self, record: &SyncRecord);
}

/// Storage handles of the owning page: its cookie jar and its query string.
#[derive(Debug, Clone, Default)]
pub struct SyncEnv {
    pub cookies: SharedCookieJar,
    pub search_params: SharedSearchParams,
}

impl SyncEnv {
    pub fn new(cookies: SharedCookieJar, search_params: SharedSearchParams) -> Self {
        Self {
            cookies,
            search_params,
        }
    }
}

pub(crate) fn record_value<'a>(record: &'a SyncRecord, key: &str) -> &'a str {
    record.get(key).and_then(|v| v.as_deref()).unwrap_or("")
}

pub(crate) fn capture(params: &SearchParams, keys: &[String]) -> SyncRecord {
    keys.iter()
        .map(|k| (k.clone(), params.get(k).map(str::to_string)))
        .collect()
}

/// Applies the managed keys of `record` onto `params`; returns whether anything changed.
pub(crate) fn apply_partial(params: &mut SearchParams, keys: &[String], record: &SyncRecord) -> bool {
    let mut changed = false;
    for key in keys {
        let next = record_value(record, key);
        if params.get(key).unwrap_or("") == next {
            continue;
        }
        if next.is_empty() {
            params.delete(key);
        } else {
            params.set(key, next);
        }
        changed = true;
    }
    changed
}
