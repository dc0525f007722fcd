//! Inputs and helpers for building window summaries.

use serde::Serialize;
use std::time::Duration;

/// Why a window closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The window reached its configured age on a `record` call.
    Elapsed,
    /// The window reached its configured batch size.
    Batch,
    /// The background ticker fired.
    Schedule,
    /// The host asked for a flush.
    Manual,
}

/// What a [`Metrics`](crate::aggregator::Metrics) implementation sees when
/// asked to summarize its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryContext {
    /// How long the window was open.
    pub elapsed: Duration,
    /// Events recorded into the window.
    pub event_count: u64,
    /// Entries to keep in ranked breakdowns.
    pub top_n: usize,
    pub trigger: Trigger,
}

/// Fields every summary record carries in addition to its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowHeader {
    /// Window length in milliseconds.
    pub period_ms: u64,
    pub event_count: u64,
    pub trigger: Trigger,
}

impl From<&SummaryContext> for WindowHeader {
    fn from(ctx: &SummaryContext) -> Self {
        Self {
            period_ms: ctx.elapsed.as_millis() as u64,
            event_count: ctx.event_count,
            trigger: ctx.trigger,
        }
    }
}

/// A summary body prefixed by its [`WindowHeader`], serialized flat.
#[derive(Debug, Serialize)]
pub(crate) struct Framed<'a, S: Serialize> {
    #[serde(flatten)]
    pub header: WindowHeader,
    #[serde(flatten)]
    pub body: &'a S,
}

/// `numerator / denominator`, or `None` when the denominator is zero.
///
/// Serializes as `null`, which keeps a 0/0 window distinguishable from a
/// genuine 0 rate.
pub fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// [`ratio`] as a percentage rounded to two decimals.
///
/// ```rust
/// use riepilogo::summary::percentage;
///
/// assert_eq!(percentage(1, 3), Some(33.33));
/// assert_eq!(percentage(0, 0), None);
/// ```
pub fn percentage(numerator: u64, denominator: u64) -> Option<f64> {
    ratio(numerator, denominator).map(|r| (r * 10_000.0).round() / 100.0)
}
