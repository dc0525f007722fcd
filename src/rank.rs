//! Top-N selection over dimension counts.
//!
//! Entries are ordered by count, highest first. Equal counts are ordered by
//! key, ascending, so a summary built from the same counts always lists the
//! same entries in the same order regardless of hash map iteration order.
//!
//! ```rust
//! use riepilogo::rank::top_n;
//! use std::collections::HashMap;
//!
//! let counts: HashMap<String, u64> = [("A", 10), ("C", 7), ("B", 7), ("D", 3)]
//!     .into_iter()
//!     .map(|(k, v)| (k.to_string(), v))
//!     .collect();
//!
//! let top = top_n(&counts, 3);
//! let keys: Vec<&str> = top.iter().map(|r| r.key.as_str()).collect();
//! assert_eq!(keys, ["A", "B", "C"]);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One entry of a ranked breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranked {
    /// The dimension key (product id, currency pair, ...).
    pub key: String,
    /// Occurrences of the key in the window.
    pub count: u64,
}

impl Ranked {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Ranking order: count descending, then key ascending.
fn by_rank(a: &Ranked, b: &Ranked) -> Ordering {
    b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key))
}

/// Returns the `n` highest-count entries of `counts`.
///
/// Returns every entry (ranked) when there are fewer than `n`.
pub fn top_n<'a, I>(counts: I, n: usize) -> Vec<Ranked>
where
    I: IntoIterator<Item = (&'a String, &'a u64)>,
{
    let mut ranked: Vec<Ranked> = counts
        .into_iter()
        .map(|(key, count)| Ranked::new(key.clone(), *count))
        .collect();

    if ranked.len() > n {
        // Partition, then sort only the kept entries.
        ranked.select_nth_unstable_by(n, by_rank);
        ranked.truncate(n);
    }
    ranked.sort_unstable_by(by_rank);
    ranked
}
