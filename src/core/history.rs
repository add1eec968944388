//! History policies and the records they produce.
//!
//! A composite state with a history policy remembers where it was left,
//! so that re-entering it resumes there instead of at its initial child.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// What a composite state remembers when it is exited.
///
/// # Example
///
/// ```rust
/// use hsmcore::core::HistoryPolicy;
///
/// assert!(!HistoryPolicy::None.is_enabled());
/// assert!(HistoryPolicy::Deep.is_enabled());
/// assert_eq!(HistoryPolicy::default(), HistoryPolicy::None);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryPolicy {
    /// Always re-enter through the initial child.
    #[default]
    None,
    /// Remember the last active immediate child.
    Shallow,
    /// Remember the last active leaf.
    Deep,
}

impl HistoryPolicy {
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Remembered descendants, keyed by composite state.
///
/// Entries are created lazily on the first exit of a composite state and
/// overwritten on every later exit.
#[derive(Clone, Debug)]
pub struct HistoryRecords<K> {
    entries: HashMap<K, K>,
}

impl<K> Default for HistoryRecords<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> HistoryRecords<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `descendant` for `composite`, replacing any earlier record.
    pub fn record(&mut self, composite: K, descendant: K) {
        self.entries.insert(composite, descendant);
    }

    pub fn get(&self, composite: K) -> Option<K> {
        self.entries.get(&composite).copied()
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

    pub fn iter(&self) -> impl Iterator<Item = (K, K)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_records_are_empty() {
        let records: HistoryRecords<usize> = HistoryRecords::new();
        assert!(records.is_empty());
        assert_eq!(records.get(0), None);
    }

    #[test]
    fn record_overwrites_previous_entry() {
        let mut records = HistoryRecords::new();
        records.record(1usize, 2usize);
        records.record(1, 3);

        assert_eq!(records.len(), 1);
        assert_eq!(records.get(1), Some(3));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut records = HistoryRecords::new();
        records.record(1usize, 2usize);
        records.record(4, 5);
        records.clear();

        assert!(records.is_empty());
    }

    #[test]
    fn policy_serializes_by_name() {
        let json = serde_json::to_string(&HistoryPolicy::Shallow).unwrap();
        assert_eq!(json, "\"Shallow\"");
    }
}
