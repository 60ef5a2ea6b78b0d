//! Pending writes of open transactions
//!
//! Every key carries its own ordered map of depth → write. The visible
//! write for a key is always the one at the highest open depth, found by
//! an ordered range lookup rather than by insertion order.

use std::collections::{BTreeMap, HashMap};

/// A tentative write recorded inside a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    Value(String),
    /// The key is deleted at this depth
    Tombstone,
}

impl PendingWrite {
    /// The written value, `None` for a tombstone
    pub fn as_value(&self) -> Option<&str> {
        match self {
            PendingWrite::Value(value) => Some(value),
            PendingWrite::Tombstone => None,
        }
    }

    pub fn into_value(self) -> Option<String> {
        match self {
            PendingWrite::Value(value) => Some(value),
            PendingWrite::Tombstone => None,
        }
    }
}

impl From<Option<String>> for PendingWrite {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(value) => PendingWrite::Value(value),
            None => PendingWrite::Tombstone,
        }
    }
}

/// Per-key stacks of pending writes, indexed by nesting depth
#[derive(Debug, Default)]
pub struct TransactionStack {
    writes: HashMap<String, BTreeMap<usize, PendingWrite>>,
}

impl TransactionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the write for `key` at the highest depth not above `depth`
    pub fn resolve(&self, key: &str, depth: usize) -> Option<&PendingWrite> {
        self.writes
            .get(key)?
            .range(..=depth)
            .next_back()
            .map(|(_, write)| write)
    }

    /// Record `write` for `key` at `depth`, replacing any earlier write at that depth
    pub fn record(&mut self, key: &str, depth: usize, write: PendingWrite) {
        match self.writes.get_mut(key) {
            Some(stack) => {
                stack.insert(depth, write);
            }
            None => {
                self.writes
                    .insert(key.to_string(), BTreeMap::from([(depth, write)]));
            }
        }
    }

    /// Remove every write made at exactly `depth` and hand them back
    pub fn discard_depth(&mut self, depth: usize) -> Vec<(String, PendingWrite)> {
        let mut discarded = Vec::new();
        self.writes.retain(|key, stack| {
            if let Some(write) = stack.remove(&depth) {
                discarded.push((key.clone(), write));
            }
            !stack.is_empty()
        });
        discarded
    }

    /// Empty the stack, yielding the top-most write of every key
    pub fn drain_effective(&mut self) -> impl Iterator<Item = (String, PendingWrite)> {
        std::mem::take(&mut self.writes)
            .into_iter()
            .filter_map(|(key, mut stack)| stack.pop_last().map(|(_, write)| (key, write)))
    }

    /// Number of keys with at least one pending write
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(v: &str) -> PendingWrite {
        PendingWrite::Value(v.to_string())
    }

    #[test]
    fn test_resolve_uses_highest_depth() {
        let mut stack = TransactionStack::new();
        // Recorded out of depth order on purpose
        stack.record("a", 3, value("three"));
        stack.record("a", 1, value("one"));
        stack.record("a", 2, PendingWrite::Tombstone);

        assert_eq!(stack.resolve("a", 3), Some(&value("three")));
        assert_eq!(stack.resolve("a", 2), Some(&PendingWrite::Tombstone));
        assert_eq!(stack.resolve("a", 1), Some(&value("one")));
        assert_eq!(stack.resolve("a", 0), None);
        assert_eq!(stack.resolve("b", 3), None);
    }

    #[test]
    fn test_record_overwrites_same_depth() {
        let mut stack = TransactionStack::new();
        stack.record("a", 1, value("x"));
        stack.record("a", 1, value("y"));
        assert_eq!(stack.resolve("a", 1), Some(&value("y")));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_discard_depth_only_touches_that_depth() {
        let mut stack = TransactionStack::new();
        stack.record("a", 1, value("a1"));
        stack.record("a", 2, value("a2"));
        stack.record("b", 2, PendingWrite::Tombstone);
        stack.record("c", 1, value("c1"));

        let mut discarded = stack.discard_depth(2);
        discarded.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(
            discarded,
            vec![
                ("a".to_string(), value("a2")),
                ("b".to_string(), PendingWrite::Tombstone),
            ]
        );

        assert_eq!(stack.resolve("a", 2), Some(&value("a1")));
        assert_eq!(stack.resolve("b", 2), None);
        assert_eq!(stack.resolve("c", 2), Some(&value("c1")));
        // "b" had nothing left and is gone entirely
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_drain_effective() {
        let mut stack = TransactionStack::new();
        stack.record("a", 1, value("a1"));
        stack.record("a", 4, PendingWrite::Tombstone);
        stack.record("b", 2, value("b2"));

        let mut drained: Vec<_> = stack.drain_effective().collect();
        drained.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(
            drained,
            vec![
                ("a".to_string(), PendingWrite::Tombstone),
                ("b".to_string(), value("b2")),
            ]
        );
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pending_write_conversions() {
        assert_eq!(PendingWrite::from(Some("v".to_string())), value("v"));
        assert_eq!(PendingWrite::from(None), PendingWrite::Tombstone);
        assert_eq!(value("v").as_value(), Some("v"));
        assert_eq!(PendingWrite::Tombstone.into_value(), None);
    }
}
