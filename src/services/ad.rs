//! Ad serving statistics.
//!
//! Serves per category, context keys of ad requests and service errors by
//! type share a five minute window. The summary is raised to `warn` when
//! the window saw any error.

use super::service_facade;
use crate::aggregator::{Aggregator, Metrics};
use crate::config::{AggregatorConfig, DEFAULT_WINDOW};
use crate::dimension::{key_or_unknown, DimensionCounts};
use crate::rank::Ranked;
use crate::record::{Severity, Significant};
use crate::summary::SummaryContext;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub enum AdEvent<'a> {
    Request { context_keys: &'a [&'a str] },
    Served { category: Option<&'a str> },
    Error { error_type: &'a str },
}

#[derive(Debug, Default)]
pub struct AdStats {
    category_serves: DimensionCounts,
    context_keys: DimensionCounts,
    errors: DimensionCounts,
}

#[derive(Debug, Serialize)]
pub struct AdStatsSummary {
    pub category_serves: BTreeMap<String, u64>,
    pub top_context_keys: Vec<Ranked>,
    pub error_counts: BTreeMap<String, u64>,
}

impl Metrics for AdStats {
    type Event<'a> = AdEvent<'a>;
    type Summary = AdStatsSummary;

    const SOURCE: &'static str = "ad";
    const SUMMARY_EVENT: &'static str = "ad_stats_summary";
    const SUMMARY_MESSAGE: &'static str = "Ad service statistics summary";

    fn apply(&mut self, event: AdEvent<'_>) {
        match event {
            AdEvent::Request { context_keys } => {
                for key in context_keys {
                    self.context_keys.incr(key);
                }
            }
            AdEvent::Served { category } => self.category_serves.incr(key_or_unknown(category)),
            AdEvent::Error { error_type } => self.errors.incr(error_type),
        }
    }

    fn summarize(&self, ctx: &SummaryContext) -> AdStatsSummary {
        AdStatsSummary {
            category_serves: self.category_serves.sorted(),
            top_context_keys: self.context_keys.top(ctx.top_n),
            error_counts: self.errors.sorted(),
        }
    }

    fn summary_severity(&self) -> Severity {
        if self.errors.is_empty() {
            Severity::Info
        } else {
            Severity::Warn
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdRequest<'a> {
    pub context_keys: &'a [&'a str],
    pub ads_returned: usize,
}

impl Significant for AdRequest<'_> {
    const EVENT_TYPE: &'static str = "ad_request";

    fn message(&self) -> &'static str {
        "Ad request processed"
    }
}

#[derive(Debug, Serialize)]
pub struct AdError<'a> {
    pub error_type: &'a str,
    pub error: &'a str,
}

impl Significant for AdError<'_> {
    const EVENT_TYPE: &'static str = "ad_error";

    fn message(&self) -> &'static str {
        "Ad service error"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

/// Ad service business events.
#[derive(Debug, Clone)]
pub struct AdAggregator {
    inner: Aggregator<AdStats>,
}

service_facade!(
    AdAggregator,
    AdStats,
    AggregatorConfig::new().with_window(DEFAULT_WINDOW)
);

impl AdAggregator {
    /// Counts and passes through a request that carried context keys.
    /// Requests without context keys are ignored.
    pub fn request(&self, context_keys: &[&str], ads_returned: usize) {
        if context_keys.is_empty() {
            return;
        }
        self.inner.record(AdEvent::Request { context_keys });
        self.inner.emit(&AdRequest {
            context_keys,
            ads_returned,
        });
    }

    pub fn served(&self, category: Option<&str>) {
        self.inner.record(AdEvent::Served { category });
    }

    /// Counts an error by type and passes it through.
    pub fn error(&self, error_type: &str, error: &str) {
        self.inner.record(AdEvent::Error { error_type });
        self.inner.emit(&AdError { error_type, error });
    }
}
