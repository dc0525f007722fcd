//! Time sources used by aggregation windows.
//!
//! Windows measure their age with a monotonic [`Instant`] and stamp summary
//! records with wall-clock milliseconds since the Unix epoch. Both readings
//! come from a [`Clock`] so tests can drive time explicitly with
//! [`ManualClock`] instead of sleeping.
//!
//! # Examples
//!
//! ```rust
//! use riepilogo::clock::{Clock, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(300));
//! assert_eq!(clock.now() - start, Duration::from_secs(300));
//! ```

use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of monotonic and wall-clock time.
pub trait Clock: Debug + Send + Sync {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;

    /// Returns the current wall-clock time in milliseconds since the Unix epoch.
    fn unix_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn unix_ms(&self) -> u64 {
        (**self).unix_ms()
    }
}

/// The process clock: [`Instant::now`] and [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// Both readings advance together: after `advance(d)`, `now()` is `d` later
/// and `unix_ms()` is `d` (in milliseconds) later.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    origin_ms: u64,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_ms: SystemClock.unix_ms(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Creates a clock whose wall-clock reading starts at `unix_ms`.
    pub fn starting_at(unix_ms: u64) -> Self {
        Self {
            origin_ms: unix_ms,
            ..Self::new()
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    /// Returns how far the clock has been advanced since creation.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }

    fn unix_ms(&self) -> u64 {
        self.origin_ms + self.offset.lock().as_millis() as u64
    }
}
