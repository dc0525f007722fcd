//! Sharded lifetime counters.
//!
//! Aggregation windows are guarded by a lock, but an aggregator also keeps a
//! few counters about itself (events recorded, summaries emitted, ...) that
//! are bumped on every call and read rarely. Those live in a [`Tally`], a
//! counter split across cache-padded shards so concurrent callers don't
//! bounce the same cache line.
//!
//! # Architecture
//!
//! 1. A global atomic (`NEXT_SLOT_ID`) hands out sequential slot ids to threads
//! 2. Each thread keeps its id in thread-local storage
//! 3. The id modulo [`NUM_SHARDS`] picks the shard a thread writes to
//! 4. Reads sum every shard
//!
//! ```text
//!   Thread 0 ──writes──►  [Shard 0]  (CachePadded)
//!   Thread 1 ──writes──►  [Shard 1]  (CachePadded)
//!        ...                 ...
//!   Thread 63 ─writes──►  [Shard 63] (CachePadded)
//!                              │
//!                              ▼
//!                     value() sums all shards
//! ```

use crossbeam_utils::CachePadded;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Number of shards per [`Tally`].
///
/// A power of two large enough that typical request-serving thread pools
/// never share a shard.
pub const NUM_SHARDS: usize = 64;

static NEXT_SLOT_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Shard index of the current thread, assigned on first use.
    static THREAD_SLOT_INDEX: usize = next_slot_id();
}

/// Assigns the next shard index, round-robin.
fn next_slot_id() -> usize {
    NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed) % NUM_SHARDS
}

/// A monotonically increasing counter with sharded atomic storage.
///
/// `Tally` is never reset by window flushes; it counts over the lifetime
/// of its aggregator.
///
/// # Examples
///
/// ```rust
/// use riepilogo::counters::Tally;
/// use std::sync::Arc;
/// use std::thread;
///
/// let tally = Arc::new(Tally::new("recorded"));
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let t = Arc::clone(&tally);
///         thread::spawn(move || {
///             for _ in 0..1000 {
///                 t.incr();
///             }
///         })
///     })
///     .collect();
///
/// for h in handles {
///     h.join().unwrap();
/// }
///
/// assert_eq!(tally.value(), 4000);
/// ```
pub struct Tally {
    name: &'static str,
    shards: [CachePadded<AtomicU64>; NUM_SHARDS],
}

impl Tally {
    /// Creates a zeroed counter.
    pub const fn new(name: &'static str) -> Self {
        const ZERO: CachePadded<AtomicU64> = CachePadded::new(AtomicU64::new(0));
        Self {
            name,
            shards: [ZERO; NUM_SHARDS],
        }
    }

    /// Returns the counter name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    fn local_shard(&self) -> &AtomicU64 {
        THREAD_SLOT_INDEX.with(|idx| &*self.shards[*idx])
    }

    /// Adds `n` to the counter.
    #[inline]
    pub fn add(&self, n: u64) {
        self.local_shard().fetch_add(n, Ordering::Relaxed);
    }

    /// Adds one to the counter.
    #[inline]
    pub fn incr(&self) {
        self.add(1);
    }

    /// Returns the sum of all shards.
    pub fn value(&self) -> u64 {
        self.shards
            .iter()
            .map(|shard| shard.load(Ordering::Relaxed))
            .sum()
    }

    /// Returns the current thread's contribution.
    #[inline]
    pub fn local_value(&self) -> u64 {
        self.local_shard().load(Ordering::Relaxed)
    }
}

impl Default for Tally {
    fn default() -> Self {
        Self::new("")
    }
}

impl Debug for Tally {
    /// Formats as `name{ [shard]:value ... }`, non-zero shards only.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{{", self.name)?;
        for (i, shard) in self.shards.iter().enumerate() {
            let val = shard.load(Ordering::Relaxed);
            if val != 0 {
                write!(f, " [{i}]:{val}")?;
            }
        }
        write!(f, " }}")
    }
}
