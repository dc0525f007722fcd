//! Shipping quote and order statistics.
//!
//! Quotes and created shipments share one window that closes after five
//! minutes or 100 quote requests, whichever comes first. Created shipments
//! are counted in the window but do not advance the batch. They and both
//! failure kinds are also passed through.

use super::service_facade;
use crate::aggregator::{Aggregator, Metrics};
use crate::config::{AggregatorConfig, DEFAULT_WINDOW};
use crate::dimension::{DimensionCounts, UNKNOWN};
use crate::domain::{Address, Money};
use crate::record::{Severity, Significant};
use crate::summary::SummaryContext;
use serde::Serialize;
use std::collections::BTreeMap;

/// Events counted into the shipping window.
#[derive(Debug, Clone, Copy)]
pub enum ShippingEvent<'a> {
    /// A quote was computed for `region`.
    Quote { region: &'a str, amount: f64 },
    /// A shipment was created.
    Shipped,
}

#[derive(Debug, Default)]
pub struct ShippingStats {
    quote_requests: u64,
    shipping_orders: u64,
    total_quote_amount: f64,
    region_stats: DimensionCounts,
}

#[derive(Debug, Serialize)]
pub struct ShippingStatsSummary {
    pub quote_requests: u64,
    pub shipping_orders: u64,
    pub total_quote_amount: f64,
    /// Quote requests per region.
    pub region_stats: BTreeMap<String, u64>,
}

impl Metrics for ShippingStats {
    type Event<'a> = ShippingEvent<'a>;
    type Summary = ShippingStatsSummary;

    const SOURCE: &'static str = "shipping";
    const SUMMARY_EVENT: &'static str = "shipping_stats_summary";
    const SUMMARY_MESSAGE: &'static str = "Shipping statistics summary";

    fn apply(&mut self, event: ShippingEvent<'_>) {
        match event {
            ShippingEvent::Quote { region, amount } => {
                self.quote_requests += 1;
                self.region_stats.incr(region);
                self.total_quote_amount += amount;
            }
            ShippingEvent::Shipped => self.shipping_orders += 1,
        }
    }

    fn counts_toward_batch(event: &ShippingEvent<'_>) -> bool {
        matches!(event, ShippingEvent::Quote { .. })
    }

    fn summarize(&self, _: &SummaryContext) -> ShippingStatsSummary {
        ShippingStatsSummary {
            quote_requests: self.quote_requests,
            shipping_orders: self.shipping_orders,
            total_quote_amount: self.total_quote_amount,
            region_stats: self.region_stats.sorted(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderShipped<'a> {
    pub tracking_id: &'a str,
    pub address_region: &'a str,
    pub city: &'a str,
}

impl Significant for OrderShipped<'_> {
    const EVENT_TYPE: &'static str = "order_shipped";

    fn message(&self) -> &'static str {
        "Shipping order created"
    }
}

#[derive(Debug, Serialize)]
pub struct QuoteError<'a> {
    pub address_region: &'a str,
    pub error: &'a str,
}

impl Significant for QuoteError<'_> {
    const EVENT_TYPE: &'static str = "quote_error";

    fn message(&self) -> &'static str {
        "Failed to generate shipping quote"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

#[derive(Debug, Serialize)]
pub struct ShippingError<'a> {
    pub address_region: &'a str,
    pub error: &'a str,
}

impl Significant for ShippingError<'_> {
    const EVENT_TYPE: &'static str = "shipping_error";

    fn message(&self) -> &'static str {
        "Failed to create shipping order"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

fn region_of(address: Option<&Address>) -> &str {
    address.map_or(UNKNOWN, Address::region)
}

/// Shipping business events.
#[derive(Debug, Clone)]
pub struct ShippingAggregator {
    inner: Aggregator<ShippingStats>,
}

service_facade!(
    ShippingAggregator,
    ShippingStats,
    AggregatorConfig::new()
        .with_window(DEFAULT_WINDOW)
        .with_batch_size(100)
);

impl ShippingAggregator {
    /// Counts a computed quote. A missing address or quote counts under
    /// the `unknown` region with a zero amount.
    pub fn quote_request(&self, address: Option<&Address>, quote: Option<&Money>) {
        self.inner.record(ShippingEvent::Quote {
            region: region_of(address),
            amount: quote.map_or(0.0, Money::amount),
        });
    }

    /// Counts a created shipment and passes it through.
    pub fn shipping_order(&self, address: Option<&Address>, tracking_id: &str) {
        self.inner.record(ShippingEvent::Shipped);
        self.inner.emit(&OrderShipped {
            tracking_id,
            address_region: region_of(address),
            city: address.map_or("", |a| a.city.as_str()),
        });
    }

    pub fn quote_error(&self, address: Option<&Address>, error: &str) {
        self.inner.emit(&QuoteError {
            address_region: region_of(address),
            error,
        });
    }

    pub fn shipping_error(&self, address: Option<&Address>, error: &str) {
        self.inner.emit(&ShippingError {
            address_region: region_of(address),
            error,
        });
    }
}
