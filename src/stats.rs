//! Lifetime statistics of an aggregator.
//!
//! These counters sit outside the window lock and are never reset by
//! window flushes, so they answer "is this aggregator doing anything?"
//! independently of the summaries it emits.
//!
//! # Examples
//!
//! ```rust,ignore
//! let snapshot = aggregator.stats();
//! println!("{}", serde_json::to_string(&snapshot)?);
//! // {"name":"checkout","recorded":1200,"summaries":4,"skipped":0,"events":310,"dropped":0,"last_flush_ms":1700000000000}
//! ```

use crate::counters::Tally;
use atomic_time::AtomicOptionInstant;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Self-metrics of one aggregator.
pub struct AggregatorStats {
    /// Events recorded into windows.
    pub(crate) recorded: Tally,
    /// Summary records handed to the sink.
    pub(crate) summaries: Tally,
    /// Windows closed empty and suppressed.
    pub(crate) skipped: Tally,
    /// Significant events passed straight through.
    pub(crate) events: Tally,
    /// Records lost because their payload failed to serialize.
    pub(crate) dropped: Tally,
    last_flush: AtomicOptionInstant,
    last_flush_ms: AtomicU64,
}

impl AggregatorStats {
    pub fn new() -> Self {
        Self {
            recorded: Tally::new("recorded"),
            summaries: Tally::new("summaries"),
            skipped: Tally::new("skipped"),
            events: Tally::new("events"),
            dropped: Tally::new("dropped"),
            last_flush: AtomicOptionInstant::none(),
            last_flush_ms: AtomicU64::new(0),
        }
    }

    /// Remembers when the last window closed.
    pub(crate) fn mark_flush(&self, at: Instant, unix_ms: u64) {
        self.last_flush.store(Some(at), Ordering::Relaxed);
        self.last_flush_ms.store(unix_ms, Ordering::Relaxed);
    }

    /// Monotonic instant of the last window close, if any.
    pub fn last_flush(&self) -> Option<Instant> {
        self.last_flush.load(Ordering::Relaxed)
    }

    /// Returns the counters as named pairs, in a fixed order.
    pub fn counters(&self) -> [(&'static str, u64); 5] {
        [
            (self.recorded.name(), self.recorded.value()),
            (self.summaries.name(), self.summaries.value()),
            (self.skipped.name(), self.skipped.value()),
            (self.events.name(), self.events.value()),
            (self.dropped.name(), self.dropped.value()),
        ]
    }

    /// Captures the current values under `name`.
    pub fn snapshot(&self, name: &str) -> StatsSnapshot {
        let last_flush_ms = self.last_flush_ms.load(Ordering::Relaxed);
        StatsSnapshot {
            name: name.to_string(),
            recorded: self.recorded.value(),
            summaries: self.summaries.value(),
            skipped: self.skipped.value(),
            events: self.events.value(),
            dropped: self.dropped.value(),
            last_flush_ms: (last_flush_ms != 0).then_some(last_flush_ms),
        }
    }
}

impl Debug for AggregatorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AggregatorStats");
        for (name, value) in self.counters() {
            s.field(name, &value);
        }
        s.field("last_flush", &self.last_flush()).finish()
    }
}

impl Default for AggregatorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable point-in-time copy of [`AggregatorStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Aggregator name.
    pub name: String,
    pub recorded: u64,
    pub summaries: u64,
    pub skipped: u64,
    pub events: u64,
    pub dropped: u64,
    /// Wall-clock time of the last window close, milliseconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_flush_ms: Option<u64>,
}

impl StatsSnapshot {
    /// Returns a counter by name.
    pub fn get(&self, counter: &str) -> Option<u64> {
        match counter {
            "recorded" => Some(self.recorded),
            "summaries" => Some(self.summaries),
            "skipped" => Some(self.skipped),
            "events" => Some(self.events),
            "dropped" => Some(self.dropped),
            _ => None,
        }
    }
}
