use std::collections::HashMap;
use std::collections::hash_map;

use crate::corpus::WordId;
use crate::log_math::{LOG_ZERO, log_add};

/// (source word, target word)
pub type WordPair = (WordId, WordId);

/// Sparse table of log-domain values keyed by word pair. Absent keys read as
/// `LOG_ZERO`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogTable {
    entries: HashMap<WordPair, f64>,
}

impl LogTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, source: WordId, target: WordId) -> f64 {
        self.entries
            .get(&(source, target))
            .copied()
            .unwrap_or(LOG_ZERO)
    }

    /// Stored value, `None` when the pair was never materialized.
    pub fn entry(&self, source: WordId, target: WordId) -> Option<f64> {
        self.entries.get(&(source, target)).copied()
    }

    pub fn contains(&self, source: WordId, target: WordId) -> bool {
        self.entries.contains_key(&(source, target))
    }

    pub fn set(&mut self, source: WordId, target: WordId, value: f64) {
        self.entries.insert((source, target), value);
    }

    /// `self[s, t] = log_add(self[s, t], value)`. Adding `LOG_ZERO` is a
    /// no-op and does not materialize the key.
    #[inline]
    pub fn log_add(&mut self, source: WordId, target: WordId, value: f64) {
        if value == LOG_ZERO {
            return;
        }
        let slot = self.entries.entry((source, target)).or_insert(LOG_ZERO);
        *slot = log_add(*slot, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> hash_map::Keys<'_, WordPair, f64> {
        self.entries.keys()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, WordPair, f64> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> hash_map::IterMut<'_, WordPair, f64> {
        self.entries.iter_mut()
    }
}
