//! When does a window close?
//!
//! [`FlushPolicy`] is evaluated under the window lock on every `record`
//! call. It knows two triggers: window age (only in
//! [`FlushMode::Lazy`]; in [`FlushMode::Timer`] the ticker owns time) and
//! event count (whenever a batch size is configured). Only events that
//! [`Metrics::counts_toward_batch`](crate::Metrics::counts_toward_batch)
//! advance the batch.

use crate::config::{AggregatorConfig, FlushMode};
use crate::summary::Trigger;
use crate::window::Window;
use std::time::{Duration, Instant};

/// The trigger rules of one aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    window: Duration,
    batch_size: Option<u64>,
    mode: FlushMode,
}

impl FlushPolicy {
    /// Time-only, evaluated on `record`.
    pub fn lazy(window: Duration) -> Self {
        Self {
            window,
            batch_size: None,
            mode: FlushMode::Lazy,
        }
    }

    pub fn from_config(config: &AggregatorConfig) -> Self {
        Self {
            window: config.window,
            batch_size: config.batch_size,
            mode: config.mode,
        }
    }

    /// Adds a batch-size trigger.
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn with_mode(mut self, mode: FlushMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the trigger that closes `window` at `now`, if any.
    ///
    /// The batch trigger wins when both hold.
    pub fn should_flush<M>(&self, window: &Window<M>, now: Instant) -> Option<Trigger> {
        if let Some(size) = self.batch_size {
            if window.batched() >= size {
                return Some(Trigger::Batch);
            }
        }
        if self.mode == FlushMode::Lazy && window.elapsed(now) >= self.window {
            return Some(Trigger::Elapsed);
        }
        None
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn mode(&self) -> FlushMode {
        self.mode
    }
}
