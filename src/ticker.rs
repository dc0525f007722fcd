//! Background flush timer for [`FlushMode::Timer`](crate::config::FlushMode::Timer).
//!
//! A [`Ticker`] owns one named OS thread that calls [`Tick::tick`] after
//! one period, then after whatever delay each tick returns. The thread
//! holds only a weak reference
//! to its target, so it never keeps an aggregator alive: when the last
//! handle goes away the ticker's stop channel disconnects and the thread
//! exits on its next wake-up.
//!
//! ```text
//!   Aggregator (Arc<Shared>) ──owns──► Ticker ──stop channel──► thread
//!            ▲                                                   │
//!            └───────────────────── Weak ────────────────────────┘
//! ```

use parking_lot::Mutex;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Weak;
use std::thread;
use std::time::Duration;

/// Floor on the delay between two ticks.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Something driven by a [`Ticker`].
pub(crate) trait Tick: Send + Sync {
    /// Runs one tick and returns how long to wait before the next one.
    fn tick(&self) -> Duration;
}

/// Handle to a running timer thread.
#[derive(Debug)]
pub(crate) struct Ticker {
    period: Duration,
    // Dropping the sender disconnects the channel and stops the thread.
    stop: Mutex<Option<Sender<()>>>,
}

impl Ticker {
    /// Starts a thread whose first `target.tick()` lands after `period`.
    pub(crate) fn spawn(name: &str, period: Duration, target: Weak<dyn Tick>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let thread_name = format!("riepilogo-{}", name);
        thread::Builder::new()
            .name(thread_name)
            .spawn(move || run(rx, period, target))?;
        tracing::debug!(source = name, period_ms = period.as_millis() as u64, "ticker started");
        Ok(Self {
            period,
            stop: Mutex::new(Some(tx)),
        })
    }

    pub(crate) fn period(&self) -> Duration {
        self.period
    }

    /// Stops the thread. Idempotent; never blocks on the thread.
    pub(crate) fn stop(&self) {
        if let Some(tx) = self.stop.lock().take() {
            let _ = tx.send(());
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.stop.lock().is_some()
    }
}

fn run(stop: Receiver<()>, period: Duration, target: Weak<dyn Tick>) {
    let mut wait = period;
    loop {
        match stop.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {
                let Some(target) = target.upgrade() else {
                    break;
                };
                wait = target.tick().max(MIN_WAIT);
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::debug!("ticker stopped");
}
