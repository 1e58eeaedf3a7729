use super::{ColumnKey, SortFilterAction, SortFilterEngine};
use crate::error::GridResult;

/// Free-text input bound to one column's filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFilter<K> {
    key: K,
}

impl<K: ColumnKey> TextFilter<K> {
    pub fn new(key: K) -> Self {
        Self { key }
    }

    pub fn key(&self) -> K {
        self.key
    }

    /// First selected value, or empty.
    pub fn value<T>(&self, engine: &SortFilterEngine<K, T>) -> String {
        engine
            .filter_value(&self.key)
            .and_then(|v| v.first())
            .cloned()
            .unwrap_or_default()
    }

    /// Column label, falling back to the key name.
    pub fn label<T>(&self, engine: &SortFilterEngine<K, T>) -> String {
        engine
            .config_map()
            .get(&self.key)
            .and_then(|c| c.label_text())
            .unwrap_or(self.key.as_str())
            .to_string()
    }

    pub fn on_change<T>(&self, engine: &mut SortFilterEngine<K, T>, text: &str) -> GridResult<()> {
        engine.dispatch(self.action(text))
    }

    /// The action `on_change` performs, for callers that queue actions.
    pub fn action(&self, text: &str) -> SortFilterAction<K> {
        if text.is_empty() {
            SortFilterAction::ClearFilter(Some(self.key))
        } else {
            SortFilterAction::FilterBy {
                key: self.key,
                value: vec![text.to_string()],
            }
        }
    }
}
