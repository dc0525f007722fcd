//! Per-key breakdowns accumulated inside a window.
//!
//! Keys appear as events referencing them arrive. Storage is a hash map
//! (order is irrelevant while accumulating); [`DimensionCounts::sorted`] and
//! [`DimensionSums::sorted`] give the ordered view used in summaries.

use crate::rank::{top_n, Ranked};
use std::collections::{BTreeMap, HashMap};

/// Sentinel key for missing or empty dimension values.
pub const UNKNOWN: &str = "unknown";

/// Returns `value` trimmed, or [`UNKNOWN`] when it is missing or blank.
///
/// ```rust
/// use riepilogo::dimension::{key_or_unknown, UNKNOWN};
///
/// assert_eq!(key_or_unknown(Some("CA")), "CA");
/// assert_eq!(key_or_unknown(Some("  ")), UNKNOWN);
/// assert_eq!(key_or_unknown(None), UNKNOWN);
/// ```
pub fn key_or_unknown(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => UNKNOWN,
    }
}

/// Occurrence count per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionCounts {
    counts: HashMap<String, u64>,
}

impl DimensionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one occurrence of `key`; blank keys count as [`UNKNOWN`].
    pub fn incr(&mut self, key: &str) {
        self.add(key, 1);
    }

    /// Adds `n` occurrences of `key`; blank keys count as [`UNKNOWN`].
    pub fn add(&mut self, key: &str, n: u64) {
        let key = key_or_unknown(Some(key));
        // Allocates the key only on first sight.
        match self.counts.get_mut(key) {
            Some(count) => *count += n,
            None => {
                self.counts.insert(key.to_owned(), n);
            }
        }
    }

    /// Returns the count of `key`, zero when absent.
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `n` highest counts, ties by key ascending.
    pub fn top(&self, n: usize) -> Vec<Ranked> {
        top_n(&self.counts, n)
    }

    /// All counts ordered by key.
    pub fn sorted(&self) -> BTreeMap<String, u64> {
        self.counts
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Accumulated amount per key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionSums {
    sums: HashMap<String, f64>,
}

impl DimensionSums {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to `key`; blank keys accumulate under [`UNKNOWN`].
    pub fn add(&mut self, key: &str, amount: f64) {
        let key = key_or_unknown(Some(key));
        match self.sums.get_mut(key) {
            Some(sum) => *sum += amount,
            None => {
                self.sums.insert(key.to_owned(), amount);
            }
        }
    }

    /// Returns the sum of `key`, zero when absent.
    pub fn get(&self, key: &str) -> f64 {
        self.sums.get(key).copied().unwrap_or(0.0)
    }

    /// Sum over every key.
    pub fn total(&self) -> f64 {
        self.sums.values().sum()
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// All sums ordered by key.
    pub fn sorted(&self) -> BTreeMap<String, f64> {
        self.sums.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}
