//! Recommendation request statistics.
//!
//! The window closes every 20 requests, and a background timer closes it
//! once a minute during quiet periods. A window with no requests is never
//! reported.

use super::service_facade;
use crate::aggregator::{Aggregator, Metrics};
use crate::config::{AggregatorConfig, EmptyWindow, FlushMode};
use crate::dimension::DimensionCounts;
use crate::rank::Ranked;
use crate::record::{Severity, Significant};
use crate::summary::SummaryContext;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct RecommendationStats {
    request_count: u64,
    total_recommendations: u64,
    products: DimensionCounts,
}

#[derive(Debug, Serialize)]
pub struct RecommendationReport {
    pub request_count: u64,
    pub total_recommendations: u64,
    pub top_products: Vec<Ranked>,
}

impl Metrics for RecommendationStats {
    /// Product ids returned for one request.
    type Event<'a> = &'a [&'a str];
    type Summary = RecommendationReport;

    const SOURCE: &'static str = "recommendation";
    const SUMMARY_EVENT: &'static str = "recommendation_stats";
    const SUMMARY_MESSAGE: &'static str = "Recommendation statistics";

    fn apply(&mut self, recommended: Self::Event<'_>) {
        self.request_count += 1;
        self.total_recommendations += recommended.len() as u64;
        for product_id in recommended {
            self.products.incr(product_id);
        }
    }

    fn summarize(&self, ctx: &SummaryContext) -> RecommendationReport {
        RecommendationReport {
            request_count: self.request_count,
            total_recommendations: self.total_recommendations,
            top_products: self.products.top(ctx.top_n),
        }
    }

    fn has_activity(&self) -> bool {
        self.request_count > 0
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationError<'a> {
    pub error: &'a str,
    pub input_products: &'a [&'a str],
}

impl Significant for RecommendationError<'_> {
    const EVENT_TYPE: &'static str = "recommendation_error";

    fn message(&self) -> &'static str {
        "Recommendation error"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

/// Recommendation service business events.
#[derive(Debug, Clone)]
pub struct RecommendationAggregator {
    inner: Aggregator<RecommendationStats>,
}

service_facade!(
    RecommendationAggregator,
    RecommendationStats,
    AggregatorConfig::new()
        .with_window(Duration::from_secs(60))
        .with_batch_size(20)
        .with_mode(FlushMode::Timer)
        .with_empty_window(EmptyWindow::Skip)
);

impl RecommendationAggregator {
    pub fn request(&self, recommended: &[&str]) {
        self.inner.record(recommended);
    }

    pub fn error(&self, error: &str, input_products: &[&str]) {
        self.inner.emit(&RecommendationError {
            error,
            input_products,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::harness;
    use crate::services::Service;

    #[test]
    fn test_batch_of_20_requests() {
        let h = harness::<RecommendationAggregator>();
        for i in 0..20 {
            let products: &[&str] = if i % 2 == 0 { &["A", "B"] } else { &["A"] };
            h.service.request(products);
        }

        let summaries = h.sink.summaries();
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.u64_field("request_count"), Some(20));
        assert_eq!(s.u64_field("total_recommendations"), Some(30));
        assert_eq!(
            s.field("top_products").cloned().unwrap(),
            serde_json::json!([{"key": "A", "count": 20}, {"key": "B", "count": 10}])
        );
    }

    #[test]
    fn test_quiet_period_tick() {
        let h = harness::<RecommendationAggregator>();
        assert!(!h.service.aggregator().tick());

        h.service.request(&["X"]);
        assert!(h.service.aggregator().tick());
        assert_eq!(
            h.sink.summaries()[0].str_field("trigger"),
            Some("schedule")
        );
    }

    #[test]
    fn test_error_passthrough() {
        let h = harness::<RecommendationAggregator>();
        h.service.error("catalog unavailable", &["A", "B"]);

        let events = h.sink.events();
        assert_eq!(events[0].event_type, "recommendation_error");
        assert_eq!(events[0].severity, Severity::Error);
        assert_eq!(
            events[0].field("input_products").cloned().unwrap(),
            serde_json::json!(["A", "B"])
        );
    }
}
