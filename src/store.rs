//! In-memory key-value store with nested transactions
//!
//! Committed data lives in a base table. While at least one transaction is
//! open, writes go to the pending stack instead and are folded into the
//! base table on commit or dropped scope by scope on rollback. Value
//! frequencies are maintained incrementally alongside every mutation.

use crate::error::{Result, TxVaultError};
use crate::frequency::FrequencyIndex;
use crate::pending::{PendingWrite, TransactionStack};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Operations the command dispatcher drives
pub trait Database {
    /// Set `key` to `value`
    fn set(&mut self, key: &str, value: &str);

    /// Effective value of `key`, `None` when unset
    fn get(&self, key: &str) -> Option<&str>;

    /// Remove `key`
    fn unset(&mut self, key: &str);

    /// Number of keys whose effective value equals `value`
    fn num_equal_to(&self, value: &str) -> usize;

    /// Open a nested transaction
    fn begin(&mut self);

    /// Fold every open transaction into the base table
    fn commit(&mut self) -> Result<()>;

    /// Discard the innermost open transaction
    fn rollback(&mut self) -> Result<()>;

    /// Number of open transactions
    fn depth(&self) -> usize;
}

/// Single-session transactional store
#[derive(Debug, Default)]
pub struct MemoryStore {
    base: HashMap<String, String>,
    pending: TransactionStack,
    base_freq: FrequencyIndex,
    txn_freq: FrequencyIndex,
    depth: usize,
}

impl MemoryStore {
    /// Create an empty store with no open transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed keys
    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Apply a set (`Some`) or unset (`None`) at the current depth
    fn write(&mut self, key: &str, value: Option<&str>) {
        let current = self.get(key).map(str::to_owned);
        if current.as_deref() == value {
            trace!(key, ?value, "write suppressed, value unchanged");
            return;
        }

        if self.depth > 0 {
            self.pending
                .record(key, self.depth, PendingWrite::from(value.map(str::to_owned)));
            self.txn_freq.shift(current.as_deref(), value);
        } else {
            match value {
                Some(value) => {
                    self.base.insert(key.to_string(), value.to_string());
                }
                None => {
                    self.base.remove(key);
                }
            }
            self.base_freq.shift(current.as_deref(), value);
        }
        trace!(key, ?value, depth = self.depth, "write applied");
    }
}

/// Effective value of `key` as seen from `depth`
fn resolve<'a>(
    base: &'a HashMap<String, String>,
    pending: &'a TransactionStack,
    key: &str,
    depth: usize,
) -> Option<&'a str> {
    match pending.resolve(key, depth) {
        Some(write) => write.as_value(),
        None => base.get(key).map(String::as_str),
    }
}

impl Database for MemoryStore {
    fn set(&mut self, key: &str, value: &str) {
        self.write(key, Some(value));
    }

    fn get(&self, key: &str) -> Option<&str> {
        resolve(&self.base, &self.pending, key, self.depth)
    }

    fn unset(&mut self, key: &str) {
        self.write(key, None);
    }

    fn num_equal_to(&self, value: &str) -> usize {
        let mut total = self.base_freq.count(value);
        if self.depth > 0 {
            total += self.txn_freq.count(value);
        }
        debug_assert!(total >= 0, "negative frequency {} for {:?}", total, value);
        usize::try_from(total).unwrap_or(0)
    }

    fn begin(&mut self) {
        self.depth += 1;
        debug!(depth = self.depth, "transaction opened");
    }

    fn commit(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(TxVaultError::NoTransaction);
        }

        let folded = self.pending.len();
        for (key, write) in self.pending.drain_effective() {
            let after = write.into_value();
            let before = self.base.get(&key);
            if before.map(String::as_str) == after.as_deref() {
                continue;
            }
            self.base_freq
                .shift(before.map(String::as_str), after.as_deref());
            match after {
                Some(value) => {
                    self.base.insert(key, value);
                }
                None => {
                    self.base.remove(&key);
                }
            }
        }

        self.txn_freq.clear();
        debug!(closed = self.depth, keys = folded, "transactions committed");
        self.depth = 0;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(TxVaultError::NoTransaction);
        }

        let outer = self.depth - 1;
        let discarded = self.pending.discard_depth(self.depth);
        for (key, write) in &discarded {
            // The key falls back to whatever the enclosing scope shows
            let restored = resolve(&self.base, &self.pending, key, outer);
            self.txn_freq.shift(write.as_value(), restored);
        }

        debug!(depth = self.depth, keys = discarded.len(), "transaction rolled back");
        self.depth = outer;
        if self.depth == 0 {
            debug_assert!(self.txn_freq.is_empty(), "pending deltas left after last rollback");
            self.txn_freq.clear();
        }
        Ok(())
    }

    fn depth(&self) -> usize {
        self.depth
    }
}
