//! Shopper behaviour seen by the web frontend.
//!
//! This aggregator runs on an independent timer: every five minutes the
//! window closes whether or not shoppers are active, and a window without
//! product views or checkout starts is dropped silently.

use super::service_facade;
use crate::aggregator::{Aggregator, Metrics};
use crate::config::{AggregatorConfig, EmptyWindow, FlushMode, DEFAULT_WINDOW};
use crate::dimension::{DimensionCounts, DimensionSums};
use crate::rank::Ranked;
use crate::summary::{percentage, SummaryContext};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub enum StorefrontEvent<'a> {
    ProductView { product_id: &'a str },
    CheckoutStart,
    OrderComplete { amount: f64, currency: &'a str },
    CurrencyChange { currency: &'a str },
}

#[derive(Debug, Default)]
pub struct ShopperMetrics {
    product_views: DimensionCounts,
    checkout_starts: u64,
    checkout_complete: u64,
    order_value: DimensionSums,
    currency_changes: DimensionCounts,
}

#[derive(Debug, Serialize)]
pub struct ShopperReport {
    /// Completed checkouts per started checkout, in percent; `null` when
    /// no checkout started.
    pub checkout_conversion: Option<f64>,
    pub total_checkouts: u64,
    pub total_cart_views: u64,
    pub order_value_by_currency: BTreeMap<String, f64>,
    pub currency_preferences: BTreeMap<String, u64>,
    pub top_viewed: Vec<Ranked>,
}

impl Metrics for ShopperMetrics {
    type Event<'a> = StorefrontEvent<'a>;
    type Summary = ShopperReport;

    const SOURCE: &'static str = "frontend";
    const SUMMARY_EVENT: &'static str = "business_metrics_report";
    const SUMMARY_MESSAGE: &'static str = "Frontend business metrics report";

    fn apply(&mut self, event: StorefrontEvent<'_>) {
        match event {
            StorefrontEvent::ProductView { product_id } => self.product_views.incr(product_id),
            StorefrontEvent::CheckoutStart => self.checkout_starts += 1,
            StorefrontEvent::OrderComplete { amount, currency } => {
                self.checkout_complete += 1;
                self.order_value.add(currency, amount);
            }
            StorefrontEvent::CurrencyChange { currency } => self.currency_changes.incr(currency),
        }
    }

    fn summarize(&self, ctx: &SummaryContext) -> ShopperReport {
        ShopperReport {
            checkout_conversion: percentage(self.checkout_complete, self.checkout_starts),
            total_checkouts: self.checkout_complete,
            total_cart_views: self.checkout_starts,
            order_value_by_currency: self.order_value.sorted(),
            currency_preferences: self.currency_changes.sorted(),
            top_viewed: self.product_views.top(ctx.top_n),
        }
    }

    fn has_activity(&self) -> bool {
        self.checkout_starts > 0 || !self.product_views.is_empty()
    }
}

/// Frontend business events.
#[derive(Debug, Clone)]
pub struct StorefrontAggregator {
    inner: Aggregator<ShopperMetrics>,
}

service_facade!(
    StorefrontAggregator,
    ShopperMetrics,
    AggregatorConfig::new()
        .with_window(DEFAULT_WINDOW)
        .with_mode(FlushMode::Timer)
        .with_empty_window(EmptyWindow::Skip)
);

impl StorefrontAggregator {
    pub fn product_view(&self, product_id: &str) {
        self.inner.record(StorefrontEvent::ProductView { product_id });
    }

    pub fn checkout_start(&self) {
        self.inner.record(StorefrontEvent::CheckoutStart);
    }

    pub fn order_complete(&self, amount: f64, currency: &str) {
        self.inner
            .record(StorefrontEvent::OrderComplete { amount, currency });
    }

    pub fn currency_change(&self, currency: &str) {
        self.inner.record(StorefrontEvent::CurrencyChange { currency });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::harness;
    use crate::services::Service;
    use std::time::Duration;

    #[test]
    fn test_report_on_tick() {
        let h = harness::<StorefrontAggregator>();
        h.service.product_view("OLJCESPC7Z");
        h.service.product_view("OLJCESPC7Z");
        h.service.product_view("66VCHSJNUP");
        for _ in 0..4 {
            h.service.checkout_start();
        }
        h.service.order_complete(20.5, "USD");
        h.service.order_complete(10.0, "EUR");
        h.service.order_complete(4.5, "USD");
        h.service.currency_change("JPY");

        // Age alone never closes a timer-driven window on record.
        h.clock.advance(Duration::from_secs(600));
        h.service.product_view("OLJCESPC7Z");
        assert!(h.sink.is_empty());

        assert!(h.service.aggregator().tick());
        let s = &h.sink.summaries()[0];
        assert_eq!(s.source, "frontend");
        assert_eq!(s.event_type, "business_metrics_report");
        assert_eq!(s.f64_field("checkout_conversion"), Some(75.0));
        assert_eq!(s.u64_field("total_checkouts"), Some(3));
        assert_eq!(s.u64_field("total_cart_views"), Some(4));
        assert_eq!(
            s.field("order_value_by_currency").cloned().unwrap(),
            serde_json::json!({"EUR": 10.0, "USD": 25.0})
        );
        assert_eq!(
            s.field("currency_preferences").cloned().unwrap(),
            serde_json::json!({"JPY": 1})
        );
        assert_eq!(
            s.field("top_viewed").cloned().unwrap(),
            serde_json::json!([
                {"key": "OLJCESPC7Z", "count": 3},
                {"key": "66VCHSJNUP", "count": 1},
            ])
        );
    }

    #[test]
    fn test_conversion_guard() {
        let h = harness::<StorefrontAggregator>();
        h.service.product_view("P");
        h.service.aggregator().tick();

        let s = &h.sink.summaries()[0];
        assert_eq!(s.field("checkout_conversion"), Some(&serde_json::Value::Null));
        assert_eq!(s.u64_field("total_checkouts"), Some(0));
    }

    #[test]
    fn test_inactive_window_skipped_and_reset() {
        let h = harness::<StorefrontAggregator>();
        assert!(!h.service.aggregator().tick());

        // Currency changes alone are not activity; they are still cleared.
        h.service.currency_change("EUR");
        assert!(!h.service.aggregator().tick());
        assert_eq!(h.service.aggregator().inspect(|w| w.event_count), Some(0));
        assert!(h.sink.is_empty());
        assert_eq!(h.service.aggregator().stats().skipped, 2);
    }
}
