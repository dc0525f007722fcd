//! The aggregation-and-flush engine.
//!
//! An [`Aggregator`] owns one live [`Window`] of typed counters behind a
//! single lock. Every [`record`](Aggregator::record) call:
//!
//! 1. takes the lock and reads the clock,
//! 2. applies the event to the counters and bumps the window's event count,
//! 3. asks the [`FlushPolicy`] whether the window should close,
//! 4. if so, builds the summary record and resets the window, still under
//!    the same lock,
//! 5. releases the lock and only then hands the record to the [`Sink`].
//!
//! Because building and resetting happen in one critical section, no event
//! is ever counted in two windows or lost between them, and at most one
//! caller closes any given window. Because the sink runs outside the lock,
//! a slow or re-entrant sink never blocks other recorders.
//!
//! What the counters are and how they summarize is described by a
//! [`Metrics`] implementation; see [`crate::services`] for the built-in ones.
//!
//! # Examples
//!
//! ```rust
//! use riepilogo::aggregator::{Aggregator, Metrics};
//! use riepilogo::config::AggregatorConfig;
//! use riepilogo::sink::CollectingSink;
//! use riepilogo::summary::SummaryContext;
//! use serde::Serialize;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default)]
//! struct Logins {
//!     ok: u64,
//!     failed: u64,
//! }
//!
//! #[derive(Serialize)]
//! struct LoginSummary {
//!     ok: u64,
//!     failed: u64,
//! }
//!
//! impl Metrics for Logins {
//!     type Event<'a> = bool;
//!     type Summary = LoginSummary;
//!
//!     const SOURCE: &'static str = "auth";
//!     const SUMMARY_EVENT: &'static str = "login_summary";
//!     const SUMMARY_MESSAGE: &'static str = "Login summary";
//!
//!     fn apply(&mut self, success: bool) {
//!         if success { self.ok += 1 } else { self.failed += 1 }
//!     }
//!
//!     fn summarize(&self, _: &SummaryContext) -> LoginSummary {
//!         LoginSummary { ok: self.ok, failed: self.failed }
//!     }
//! }
//!
//! let sink = Arc::new(CollectingSink::new());
//! let logins = Aggregator::<Logins>::builder()
//!     .config(AggregatorConfig::new().with_batch_size(3))
//!     .sink(Arc::clone(&sink))
//!     .build()
//!     .unwrap();
//!
//! logins.record(true);
//! logins.record(false);
//! logins.record(true);
//!
//! let summaries = sink.summaries();
//! assert_eq!(summaries.len(), 1);
//! assert_eq!(summaries[0].u64_field("ok"), Some(2));
//! assert_eq!(summaries[0].str_field("trigger"), Some("batch"));
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::{AggregatorConfig, EmptyWindow, FlushMode};
use crate::error::{Error, Result};
use crate::policy::FlushPolicy;
use crate::record::{Record, RecordKind, Severity, Significant};
use crate::sink::{Sink, TracingSink};
use crate::stats::{AggregatorStats, StatsSnapshot};
use crate::summary::{Framed, SummaryContext, Trigger, WindowHeader};
use crate::ticker::{Tick, Ticker};
use crate::window::{Window, WindowView};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

/// The typed counters of one aggregator and how they summarize.
///
/// `Default` yields the empty window; closing a window replaces the
/// counters with a fresh `Default` value.
pub trait Metrics: Default + Send + 'static {
    /// A domain event accepted by [`Aggregator::record`].
    type Event<'a>;

    /// The summary body of a closed window. Must serialize as a struct or
    /// map; its fields sit next to the window header in the record.
    type Summary: Serialize;

    /// Default aggregator name, used as the record `source`.
    const SOURCE: &'static str;

    /// `event_type` of summary records.
    const SUMMARY_EVENT: &'static str;

    /// Message of summary records.
    const SUMMARY_MESSAGE: &'static str;

    /// Folds one event into the counters.
    fn apply(&mut self, event: Self::Event<'_>);

    /// Builds the summary body. Called under the window lock.
    fn summarize(&self, ctx: &SummaryContext) -> Self::Summary;

    /// Whether the window holds anything worth reporting.
    ///
    /// Only consulted when closing a window; an inactive window is
    /// subject to the [`EmptyWindow`] policy.
    fn has_activity(&self) -> bool {
        true
    }

    /// Severity of the summary record.
    fn summary_severity(&self) -> Severity {
        Severity::Info
    }

    /// Whether `event` advances the batch size. Every event does unless
    /// overridden; events that don't are still counted in the window.
    fn counts_toward_batch(_event: &Self::Event<'_>) -> bool {
        true
    }
}

struct Shared<M: Metrics> {
    name: &'static str,
    config: AggregatorConfig,
    policy: FlushPolicy,
    window: Mutex<Window<M>>,
    sink: Arc<dyn Sink>,
    clock: Arc<dyn Clock>,
    stats: AggregatorStats,
    ticker: OnceLock<Ticker>,
}

impl<M: Metrics> Shared<M> {
    fn record(&self, event: M::Event<'_>) {
        let closed = {
            let mut window = self.window.lock();
            let now = self.clock.now();
            let metrics = if M::counts_toward_batch(&event) {
                window.count_event()
            } else {
                window.count_unbatched()
            };
            metrics.apply(event);
            self.stats.recorded.incr();
            match self.policy.should_flush(&*window, now) {
                Some(trigger) => self.close(&mut window, now, trigger),
                None => None,
            }
        };
        if let Some(record) = closed {
            self.sink.emit(&record);
        }
    }

    fn flush(&self, trigger: Trigger) -> bool {
        let closed = {
            let mut window = self.window.lock();
            let now = self.clock.now();
            self.close(&mut window, now, trigger)
        };
        match closed {
            Some(record) => {
                self.sink.emit(&record);
                true
            }
            None => false,
        }
    }

    /// Builds the summary of `window` and resets it. Must run under the lock.
    fn close(&self, window: &mut Window<M>, now: Instant, trigger: Trigger) -> Option<Record> {
        let unix_ms = self.clock.unix_ms();
        let ctx = window.context(now, self.config.top_n, trigger);
        let active = !window.is_empty() && window.metrics().has_activity();

        let built = (active || self.config.empty_window == EmptyWindow::Emit)
            .then(|| self.summarize(window.metrics(), &ctx, unix_ms));

        window.reset(now);
        self.stats.mark_flush(now, unix_ms);

        match built {
            None => {
                self.stats.skipped.incr();
                tracing::trace!(source = self.name, trigger = ?trigger, "skipped empty window");
                None
            }
            Some(Ok(record)) => {
                self.stats.summaries.incr();
                tracing::debug!(
                    source = self.name,
                    trigger = ?trigger,
                    event_count = ctx.event_count,
                    period_ms = ctx.elapsed.as_millis() as u64,
                    "window closed"
                );
                Some(record)
            }
            Some(Err(e)) => {
                self.stats.dropped.incr();
                tracing::warn!(error = %e, source = self.name, "failed to serialize summary");
                None
            }
        }
    }

    fn summarize(&self, metrics: &M, ctx: &SummaryContext, unix_ms: u64) -> serde_json::Result<Record> {
        let body = metrics.summarize(ctx);
        let framed = Framed {
            header: WindowHeader::from(ctx),
            body: &body,
        };
        Record::new(
            RecordKind::Summary,
            metrics.summary_severity(),
            self.name,
            M::SUMMARY_EVENT,
            M::SUMMARY_MESSAGE,
            unix_ms,
            &framed,
        )
    }

    fn emit<E: Significant>(&self, event: &E) {
        match Record::event(self.name, self.clock.unix_ms(), event) {
            Ok(record) => {
                self.stats.events.incr();
                self.sink.emit(&record);
            }
            Err(e) => {
                self.stats.dropped.incr();
                tracing::warn!(
                    error = %e,
                    source = self.name,
                    event_type = E::EVENT_TYPE,
                    "failed to serialize event"
                );
            }
        }
    }
}

impl<M: Metrics> Tick for Shared<M> {
    /// Closes the window only once it has lived a full period, so a window
    /// reopened by a batch close gets its whole period before the timer
    /// closes it.
    fn tick(&self) -> Duration {
        let period = self.config.window;
        let closed = {
            let mut window = self.window.lock();
            let now = self.clock.now();
            let elapsed = window.elapsed(now);
            if elapsed < period {
                return period - elapsed;
            }
            self.close(&mut window, now, Trigger::Schedule)
        };
        if let Some(record) = closed {
            self.sink.emit(&record);
        }
        period
    }
}

/// A handle to one aggregator.
///
/// Handles are cheap to clone and share one window. A handle built with
/// [`Aggregator::disabled`] has no state at all: every call is a no-op,
/// which lets call sites record unconditionally.
pub struct Aggregator<M: Metrics> {
    shared: Option<Arc<Shared<M>>>,
}

impl<M: Metrics> Aggregator<M> {
    /// Starts building an aggregator with default configuration, the
    /// [`TracingSink`] and the [`SystemClock`].
    pub fn builder() -> AggregatorBuilder<M> {
        AggregatorBuilder::new()
    }

    /// Builds an aggregator from `config` with the default sink and clock.
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// A handle that ignores every call.
    pub fn disabled() -> Self {
        Self { shared: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.is_some()
    }

    /// Name used as the `source` of every record, `None` when disabled.
    pub fn name(&self) -> Option<&'static str> {
        self.shared.as_ref().map(|s| s.name)
    }

    pub fn config(&self) -> Option<&AggregatorConfig> {
        self.shared.as_ref().map(|s| &s.config)
    }

    /// Records one event, closing the window if the flush policy says so.
    ///
    /// Never fails and never blocks on the sink of another caller.
    #[inline]
    pub fn record(&self, event: M::Event<'_>) {
        if let Some(shared) = &self.shared {
            shared.record(event);
        }
    }

    /// Sends a significant event straight to the sink, bypassing the window.
    pub fn emit<E: Significant>(&self, event: &E) {
        if let Some(shared) = &self.shared {
            shared.emit(event);
        }
    }

    /// Closes the window as the scheduled timer would.
    ///
    /// Closes regardless of the window's age. The background ticker of
    /// [`FlushMode::Timer`] instead waits until the window has lived a full
    /// period, so hosts that drive time themselves decide when to call this.
    /// Returns whether a summary was emitted.
    pub fn tick(&self) -> bool {
        match &self.shared {
            Some(shared) => shared.flush(Trigger::Schedule),
            None => false,
        }
    }

    /// Closes the window now, obeying the empty-window policy.
    ///
    /// Returns whether a summary was emitted.
    pub fn flush(&self) -> bool {
        match &self.shared {
            Some(shared) => shared.flush(Trigger::Manual),
            None => false,
        }
    }

    /// Stops the background ticker, if any, and flushes the window.
    ///
    /// Recording keeps working afterwards; only scheduled flushes stop.
    pub fn shutdown(&self) -> bool {
        match &self.shared {
            Some(shared) => {
                if let Some(ticker) = shared.ticker.get() {
                    ticker.stop();
                }
                shared.flush(Trigger::Manual)
            }
            None => false,
        }
    }

    /// Runs `f` on the live window under the window lock.
    ///
    /// Keep `f` short: every recorder waits for it.
    pub fn inspect<R>(&self, f: impl FnOnce(&WindowView<'_, M>) -> R) -> Option<R> {
        let shared = self.shared.as_ref()?;
        let window = shared.window.lock();
        let view = window.view(shared.clock.now());
        Some(f(&view))
    }

    /// Lifetime counters of this aggregator. All zero when disabled.
    pub fn stats(&self) -> StatsSnapshot {
        match &self.shared {
            Some(shared) => shared.stats.snapshot(shared.name),
            None => StatsSnapshot::default(),
        }
    }

    /// Whether a background ticker is driving scheduled flushes.
    pub fn has_timer(&self) -> bool {
        self.shared
            .as_ref()
            .and_then(|s| s.ticker.get())
            .is_some_and(Ticker::is_running)
    }
}

impl<M: Metrics> Clone for Aggregator<M> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<M: Metrics> Default for Aggregator<M> {
    fn default() -> Self {
        Self::disabled()
    }
}

impl<M: Metrics> Debug for Aggregator<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shared {
            Some(shared) => f
                .debug_struct("Aggregator")
                .field("name", &shared.name)
                .field("config", &shared.config)
                .field("timer", &shared.ticker.get().map(Ticker::period))
                .field("stats", &shared.stats)
                .finish(),
            None => f.write_str("Aggregator(disabled)"),
        }
    }
}

/// Builder for [`Aggregator`].
pub struct AggregatorBuilder<M: Metrics> {
    name: &'static str,
    config: AggregatorConfig,
    sink: Option<Arc<dyn Sink>>,
    clock: Option<Arc<dyn Clock>>,
    _metrics: PhantomData<fn() -> M>,
}

impl<M: Metrics> AggregatorBuilder<M> {
    pub fn new() -> Self {
        Self {
            name: M::SOURCE,
            config: AggregatorConfig::default(),
            sink: None,
            clock: None,
            _metrics: PhantomData,
        }
    }

    /// Overrides the record `source` (defaults to [`Metrics::SOURCE`]).
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the destination of records.
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Sets an already shared sink.
    pub fn shared_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the time source.
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Validates the configuration and starts the aggregator.
    ///
    /// In [`FlushMode::Timer`] this spawns the ticker thread.
    pub fn build(self) -> Result<Aggregator<M>> {
        self.config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink::new()));
        let shared = Arc::new(Shared {
            name: self.name,
            policy: FlushPolicy::from_config(&self.config),
            window: Mutex::new(Window::open(clock.now())),
            config: self.config,
            sink,
            clock,
            stats: AggregatorStats::new(),
            ticker: OnceLock::new(),
        });

        if shared.config.mode == FlushMode::Timer {
            let target: Weak<dyn Tick> = Arc::downgrade(&shared) as Weak<Shared<M>>;
            let ticker =
                Ticker::spawn(shared.name, shared.config.window, target).map_err(Error::Timer)?;
            let _ = shared.ticker.set(ticker);
        }

        tracing::debug!(
            source = shared.name,
            window_ms = shared.config.window.as_millis() as u64,
            batch_size = ?shared.config.batch_size,
            mode = ?shared.config.mode,
            "aggregator started"
        );
        Ok(Aggregator {
            shared: Some(shared),
        })
    }
}

impl<M: Metrics> Default for AggregatorBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ConfigError;
    use crate::dimension::DimensionCounts;
    use crate::rank::Ranked;
    use crate::sink::{CollectingSink, FnSink};
    use std::sync::Barrier;
    use std::thread;

    #[derive(Debug, Default)]
    struct Hits {
        total: u64,
        by_key: DimensionCounts,
    }

    #[derive(Serialize)]
    struct HitsSummary {
        total: u64,
        top: Vec<Ranked>,
    }

    impl Metrics for Hits {
        type Event<'a> = &'a str;
        type Summary = HitsSummary;

        const SOURCE: &'static str = "hits";
        const SUMMARY_EVENT: &'static str = "hits_summary";
        const SUMMARY_MESSAGE: &'static str = "Hits summary";

        fn apply(&mut self, key: &str) {
            self.total += 1;
            self.by_key.incr(key);
        }

        fn summarize(&self, ctx: &SummaryContext) -> HitsSummary {
            HitsSummary {
                total: self.total,
                top: self.by_key.top(ctx.top_n),
            }
        }

        fn has_activity(&self) -> bool {
            self.total > 0
        }
    }

    #[derive(Serialize)]
    struct Alarm<'a> {
        reason: &'a str,
    }

    impl Significant for Alarm<'_> {
        const EVENT_TYPE: &'static str = "alarm";

        fn message(&self) -> &'static str {
            "Alarm raised"
        }

        fn severity(&self) -> Severity {
            Severity::Error
        }
    }

    const WINDOW: Duration = Duration::from_secs(300);

    fn setup(config: AggregatorConfig) -> (Aggregator<Hits>, Arc<CollectingSink>, Arc<ManualClock>) {
        let sink = Arc::new(CollectingSink::new());
        let clock = Arc::new(ManualClock::starting_at(1_000_000));
        let aggregator = Aggregator::<Hits>::builder()
            .config(config)
            .sink(Arc::clone(&sink))
            .clock(Arc::clone(&clock))
            .build()
            .unwrap();
        (aggregator, sink, clock)
    }

    fn lazy() -> AggregatorConfig {
        AggregatorConfig::new().with_window(WINDOW)
    }

    #[test]
    fn test_record_accumulates() {
        let (agg, sink, _) = setup(lazy());
        agg.record("a");
        agg.record("b");
        agg.record("a");

        let (count, total) = agg.inspect(|w| (w.event_count, w.metrics.total)).unwrap();
        assert_eq!(count, 3);
        assert_eq!(total, 3);
        assert!(sink.is_empty());
        assert_eq!(agg.stats().recorded, 3);
    }

    #[test]
    fn test_elapsed_flush_on_record() {
        let (agg, sink, clock) = setup(lazy());
        agg.record("a");
        agg.record("b");
        clock.advance(WINDOW);
        agg.record("c");

        let summaries = sink.summaries();
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.source, "hits");
        assert_eq!(s.event_type, "hits_summary");
        assert_eq!(s.message, "Hits summary");
        assert_eq!(s.u64_field("total"), Some(3));
        assert_eq!(s.u64_field("event_count"), Some(3));
        assert_eq!(s.u64_field("period_ms"), Some(300_000));
        assert_eq!(s.str_field("trigger"), Some("elapsed"));
        assert_eq!(s.timestamp_ms, 1_300_000);

        // The window restarted with nothing in it.
        assert_eq!(agg.inspect(|w| w.event_count), Some(0));
    }

    #[test]
    fn test_reset_clears_counters_and_restarts_clock() {
        let (agg, sink, clock) = setup(lazy());
        agg.record("a");
        clock.advance(WINDOW + Duration::from_secs(10));
        agg.record("a");
        assert_eq!(sink.summaries().len(), 1);

        let (elapsed, total) = agg.inspect(|w| (w.elapsed, w.metrics.total)).unwrap();
        assert_eq!(elapsed, Duration::ZERO);
        assert_eq!(total, 0);

        // Just under a full window later nothing closes.
        clock.advance(WINDOW - Duration::from_secs(1));
        agg.record("a");
        assert_eq!(sink.summaries().len(), 1);
    }

    #[test]
    fn test_batch_of_exactly_n() {
        let (agg, sink, _) = setup(lazy().with_batch_size(100));
        for _ in 0..99 {
            agg.record("x");
        }
        assert!(sink.is_empty());

        agg.record("x");
        let summaries = sink.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].u64_field("event_count"), Some(100));
        assert_eq!(summaries[0].str_field("trigger"), Some("batch"));

        for _ in 0..99 {
            agg.record("x");
        }
        assert_eq!(sink.summaries().len(), 1);
    }

    #[test]
    fn test_top_n_in_summary() {
        let (agg, sink, _) = setup(lazy().with_top_n(2));
        for key in ["b", "a", "c", "a", "b", "a"] {
            agg.record(key);
        }
        assert!(agg.flush());

        let top = sink.summaries()[0].field("top").cloned().unwrap();
        assert_eq!(
            top,
            serde_json::json!([{"key": "a", "count": 3}, {"key": "b", "count": 2}])
        );
    }

    #[test]
    fn test_flush_manual() {
        let (agg, sink, _) = setup(lazy());
        agg.record("a");
        assert!(agg.flush());
        assert_eq!(sink.summaries()[0].str_field("trigger"), Some("manual"));

        // Nothing left to report.
        assert!(!agg.flush());
        assert_eq!(sink.len(), 1);
        assert_eq!(agg.stats().skipped, 1);
    }

    #[test]
    fn test_tick_empty_window_skip() {
        let (agg, sink, clock) = setup(lazy().with_mode(FlushMode::Timer));
        clock.advance(WINDOW);
        assert!(!agg.tick());
        assert!(sink.is_empty());

        let stats = agg.stats();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.summaries, 0);
        assert!(stats.last_flush_ms.is_some());
    }

    #[test]
    fn test_tick_empty_window_emit() {
        let config = lazy()
            .with_mode(FlushMode::Timer)
            .with_empty_window(EmptyWindow::Emit);
        let (agg, sink, clock) = setup(config);
        clock.advance(WINDOW);
        assert!(agg.tick());

        let summaries = sink.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].u64_field("total"), Some(0));
        assert_eq!(summaries[0].u64_field("event_count"), Some(0));
        assert_eq!(summaries[0].str_field("trigger"), Some("schedule"));
    }

    #[test]
    fn test_timer_mode_record_does_not_flush_on_age() {
        let (agg, sink, clock) = setup(lazy().with_mode(FlushMode::Timer));
        agg.record("a");
        clock.advance(WINDOW * 3);
        agg.record("b");
        assert!(sink.is_empty());
        assert!(agg.has_timer());

        assert!(agg.tick());
        assert_eq!(sink.summaries()[0].u64_field("total"), Some(2));
    }

    #[test]
    fn test_timer_mode_still_honors_batch() {
        let config = lazy().with_mode(FlushMode::Timer).with_batch_size(20);
        let (agg, sink, _) = setup(config);
        for _ in 0..20 {
            agg.record("p");
        }
        assert_eq!(sink.summaries().len(), 1);
        assert_eq!(sink.summaries()[0].str_field("trigger"), Some("batch"));
    }

    #[test]
    fn test_scheduled_tick_waits_for_reopened_window() {
        let config = lazy().with_mode(FlushMode::Timer).with_batch_size(3);
        let (agg, sink, clock) = setup(config);
        let shared = agg.shared.as_ref().unwrap();

        clock.advance(Duration::from_secs(200));
        for _ in 0..3 {
            agg.record("p");
        }
        assert_eq!(sink.summaries().len(), 1);

        // The batch reopened the window 200s into the period.
        agg.record("q");
        clock.advance(Duration::from_secs(100));
        assert_eq!(Tick::tick(&**shared), Duration::from_secs(200));
        assert_eq!(sink.summaries().len(), 1);

        clock.advance(Duration::from_secs(200));
        assert_eq!(Tick::tick(&**shared), WINDOW);
        let summaries = sink.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].str_field("trigger"), Some("schedule"));
        assert_eq!(summaries[1].u64_field("total"), Some(1));
    }

    #[test]
    fn test_emit_passthrough() {
        let (agg, sink, _) = setup(lazy());
        agg.emit(&Alarm { reason: "disk full" });

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "alarm");
        assert_eq!(events[0].severity, Severity::Error);
        assert_eq!(events[0].str_field("reason"), Some("disk full"));
        assert_eq!(agg.inspect(|w| w.event_count), Some(0));
        assert_eq!(agg.stats().events, 1);
    }

    #[test]
    fn test_disabled_is_noop() {
        let agg = Aggregator::<Hits>::disabled();
        assert!(!agg.is_enabled());
        agg.record("a");
        agg.emit(&Alarm { reason: "x" });
        assert!(!agg.tick());
        assert!(!agg.flush());
        assert!(!agg.shutdown());
        assert!(agg.inspect(|w| w.event_count).is_none());
        assert_eq!(agg.stats(), StatsSnapshot::default());
        assert_eq!(agg.name(), None);
        assert_eq!(format!("{:?}", agg), "Aggregator(disabled)");
    }

    #[test]
    fn test_invalid_config() {
        let err = Aggregator::<Hits>::builder()
            .config(AggregatorConfig::new().with_batch_size(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ZeroBatchSize)));
    }

    #[test]
    fn test_custom_name() {
        let sink = Arc::new(CollectingSink::new());
        let agg = Aggregator::<Hits>::builder()
            .name("frontend-hits")
            .sink(Arc::clone(&sink))
            .build()
            .unwrap();
        agg.record("a");
        agg.flush();
        assert_eq!(sink.records()[0].source, "frontend-hits");
        assert_eq!(agg.stats().name, "frontend-hits");
    }

    #[test]
    fn test_concurrent_records_none_lost() {
        let (agg, sink, _) = setup(lazy());
        let threads = 32;
        let per_thread = 1_000;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let agg = agg.clone();
                thread::spawn(move || {
                    let key = format!("k{}", t % 4);
                    for _ in 0..per_thread {
                        agg.record(key.as_str());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let expected = (threads * per_thread) as u64;
        assert_eq!(agg.inspect(|w| w.event_count), Some(expected));
        assert_eq!(agg.inspect(|w| w.metrics.by_key.total()), Some(expected));
        assert_eq!(agg.stats().recorded, expected);

        assert!(agg.flush());
        assert_eq!(sink.summaries()[0].u64_field("event_count"), Some(expected));
    }

    #[test]
    fn test_concurrent_batches_partition_events() {
        let (agg, sink, _) = setup(lazy().with_batch_size(50));
        let threads = 16;
        let per_thread = 500;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let agg = agg.clone();
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        agg.record("x");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Every event lands in exactly one window.
        let summaries = sink.summaries();
        assert_eq!(summaries.len(), threads * per_thread / 50);
        for s in &summaries {
            assert_eq!(s.u64_field("event_count"), Some(50));
        }
        assert_eq!(agg.inspect(|w| w.event_count), Some(0));
    }

    #[test]
    fn test_racing_threads_flush_once() {
        let (agg, sink, clock) = setup(lazy());
        agg.record("seed");
        clock.advance(WINDOW);

        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let agg = agg.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    agg.record("race");
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let summaries = sink.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].u64_field("event_count"), Some(2));
        assert_eq!(agg.inspect(|w| w.event_count), Some(threads as u64 - 1));
    }

    #[test]
    fn test_sink_runs_outside_lock() {
        let slot: Arc<OnceLock<Aggregator<Hits>>> = Arc::new(OnceLock::new());
        let reentrant = Arc::clone(&slot);
        let sink = FnSink::new(move |record: &Record| {
            if record.is_summary() {
                // Would deadlock if the window lock were still held.
                if let Some(agg) = reentrant.get() {
                    agg.record("from-sink");
                    let _ = agg.inspect(|w| w.event_count);
                }
            }
        });

        let agg = Aggregator::<Hits>::builder()
            .config(lazy().with_batch_size(2))
            .sink(sink)
            .build()
            .unwrap();
        let _ = slot.set(agg.clone());

        agg.record("a");
        agg.record("b");
        assert_eq!(agg.inspect(|w| w.event_count), Some(1));
    }

    #[test]
    fn test_shutdown_flushes_and_stops_timer() {
        let (agg, sink, _) = setup(lazy().with_mode(FlushMode::Timer));
        assert!(agg.has_timer());
        agg.record("a");

        assert!(agg.shutdown());
        assert!(!agg.has_timer());
        assert_eq!(sink.summaries().len(), 1);
        assert_eq!(sink.summaries()[0].str_field("trigger"), Some("manual"));
    }

    #[test]
    fn test_timer_thread_smoke() {
        let sink = Arc::new(CollectingSink::new());
        let agg = Aggregator::<Hits>::builder()
            .config(
                AggregatorConfig::new()
                    .with_window(Duration::from_millis(20))
                    .with_mode(FlushMode::Timer),
            )
            .sink(Arc::clone(&sink))
            .build()
            .unwrap();

        agg.record("a");
        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.summaries().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        let summaries = sink.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].str_field("trigger"), Some("schedule"));
        assert_eq!(summaries[0].u64_field("total"), Some(1));
        agg.shutdown();
    }

    #[test]
    fn test_summary_severity() {
        #[derive(Debug, Default)]
        struct Errors(u64);

        #[derive(Serialize)]
        struct ErrorsSummary {
            errors: u64,
        }

        impl Metrics for Errors {
            type Event<'a> = ();
            type Summary = ErrorsSummary;

            const SOURCE: &'static str = "errors";
            const SUMMARY_EVENT: &'static str = "errors_summary";
            const SUMMARY_MESSAGE: &'static str = "Errors";

            fn apply(&mut self, _: ()) {
                self.0 += 1;
            }

            fn summarize(&self, _: &SummaryContext) -> ErrorsSummary {
                ErrorsSummary { errors: self.0 }
            }

            fn summary_severity(&self) -> Severity {
                if self.0 > 0 {
                    Severity::Warn
                } else {
                    Severity::Info
                }
            }
        }

        let sink = Arc::new(CollectingSink::new());
        let agg = Aggregator::<Errors>::builder()
            .config(AggregatorConfig::new().with_empty_window(EmptyWindow::Emit))
            .sink(Arc::clone(&sink))
            .build()
            .unwrap();
        agg.record(());
        agg.flush();
        agg.flush();

        let summaries = sink.summaries();
        assert_eq!(summaries[0].severity, Severity::Warn);
        assert_eq!(summaries[0].u64_field("errors"), Some(1));
        assert_eq!(summaries[1].severity, Severity::Info);
    }
}
