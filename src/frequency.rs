//! Value-frequency counters
//!
//! Maps a value to the number of keys holding it. The engine keeps one
//! instance for the committed table and one for the net delta of all
//! pending writes, so counts here may be negative.

use std::collections::HashMap;

/// Signed value → count map. Zero counts are never stored.
#[derive(Debug, Default)]
pub struct FrequencyIndex {
    counts: HashMap<String, i64>,
}

impl FrequencyIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Count recorded for `value`, 0 when absent
    pub fn count(&self, value: &str) -> i64 {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// Move one key from `from` to `to`.
    ///
    /// `None` stands for "unset" and is not counted, so a plain insert is
    /// `shift(None, Some(v))` and a delete is `shift(Some(v), None)`.
    pub fn shift(&mut self, from: Option<&str>, to: Option<&str>) {
        if let Some(value) = from {
            self.add(value, -1);
        }
        if let Some(value) = to {
            self.add(value, 1);
        }
    }

    /// Drop every counter
    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// True when every value has a net count of zero
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    fn add(&mut self, value: &str, delta: i64) {
        match self.counts.get_mut(value) {
            Some(count) => {
                *count += delta;
                if *count == 0 {
                    self.counts.remove(value);
                }
            }
            None => {
                self.counts.insert(value.to_string(), delta);
            }
        }
    }
}
