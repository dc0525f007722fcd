//! The aggregation window.
//!
//! A [`Window`] is the unit of work: the instant it opened, how many events
//! it has seen, and the typed counters of one aggregator. Exactly one window
//! is live per aggregator; closing it replaces it in place with a fresh one.
//!
//! ```text
//!   ACCUMULATING ──[policy fires]──► BUILDING ──► RESETTING ──► ACCUMULATING
//!                                    └──── one critical section ────┘
//! ```

use crate::summary::{SummaryContext, Trigger};
use std::time::{Duration, Instant};

/// Live state of one aggregation window.
#[derive(Debug)]
pub struct Window<M> {
    started_at: Instant,
    event_count: u64,
    batched: u64,
    metrics: M,
}

impl<M: Default> Window<M> {
    /// Opens an empty window at `now`.
    pub fn open(now: Instant) -> Self {
        Self {
            started_at: now,
            event_count: 0,
            batched: 0,
            metrics: M::default(),
        }
    }

    /// Clears every counter and restarts the window clock at `now`.
    ///
    /// Returns the counters of the window that just closed.
    pub fn reset(&mut self, now: Instant) -> M {
        self.event_count = 0;
        self.batched = 0;
        // Never move the window start backwards, even with a lagging caller clock.
        self.started_at = now.max(self.started_at);
        std::mem::take(&mut self.metrics)
    }
}

impl<M> Window<M> {
    /// Counts one event toward the window and its batch, and returns the
    /// counters for mutation.
    #[inline]
    pub fn count_event(&mut self) -> &mut M {
        self.batched += 1;
        self.count_unbatched()
    }

    /// Counts one event that does not advance the batch.
    #[inline]
    pub fn count_unbatched(&mut self) -> &mut M {
        self.event_count += 1;
        &mut self.metrics
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Events counted toward the batch size.
    pub fn batched(&self) -> u64 {
        self.batched
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Age of the window at `now`; zero if `now` precedes the start.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }

    /// Builds the summary context for closing this window at `now`.
    pub fn context(&self, now: Instant, top_n: usize, trigger: Trigger) -> SummaryContext {
        SummaryContext {
            elapsed: self.elapsed(now),
            event_count: self.event_count,
            top_n,
            trigger,
        }
    }

    pub fn view(&self, now: Instant) -> WindowView<'_, M> {
        WindowView {
            elapsed: self.elapsed(now),
            event_count: self.event_count,
            metrics: &self.metrics,
        }
    }
}

/// Read-only view of a live window, handed out under the window lock.
#[derive(Debug)]
pub struct WindowView<'a, M> {
    /// Age of the window when the view was taken.
    pub elapsed: Duration,
    /// Events recorded since the window opened.
    pub event_count: u64,
    /// The typed counters.
    pub metrics: &'a M,
}
