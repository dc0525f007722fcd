//! Currency conversion patterns.

use super::service_facade;
use crate::aggregator::{Aggregator, Metrics};
use crate::config::AggregatorConfig;
use crate::dimension::{key_or_unknown, DimensionCounts};
use crate::rank::Ranked;
use crate::summary::SummaryContext;
use serde::Serialize;
use std::time::Duration;

/// A conversion between two currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

impl Conversion<'_> {
    /// The `FROM->TO` breakdown key; blank sides read `unknown`.
    pub fn pair(&self) -> String {
        format!(
            "{}->{}",
            key_or_unknown(Some(self.from)),
            key_or_unknown(Some(self.to))
        )
    }
}

#[derive(Debug, Default)]
pub struct ConversionPatterns {
    pairs: DimensionCounts,
}

#[derive(Debug, Serialize)]
pub struct ConversionReport {
    pub total_conversions: u64,
    pub top_currency_pairs: Vec<Ranked>,
}

impl Metrics for ConversionPatterns {
    type Event<'a> = Conversion<'a>;
    type Summary = ConversionReport;

    const SOURCE: &'static str = "currency";
    const SUMMARY_EVENT: &'static str = "currency_conversion_metrics";
    const SUMMARY_MESSAGE: &'static str = "Currency Conversion Patterns Report";

    fn apply(&mut self, conversion: Conversion<'_>) {
        self.pairs.incr(&conversion.pair());
    }

    fn summarize(&self, ctx: &SummaryContext) -> ConversionReport {
        ConversionReport {
            total_conversions: self.pairs.total(),
            top_currency_pairs: self.pairs.top(ctx.top_n),
        }
    }
}

/// Currency service business events.
#[derive(Debug, Clone)]
pub struct CurrencyAggregator {
    inner: Aggregator<ConversionPatterns>,
}

service_facade!(
    CurrencyAggregator,
    ConversionPatterns,
    AggregatorConfig::new().with_window(Duration::from_secs(60))
);

impl CurrencyAggregator {
    pub fn conversion(&self, from: &str, to: &str) {
        self.inner.record(Conversion { from, to });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::harness;

    #[test]
    fn test_pair_key() {
        assert_eq!(Conversion { from: "USD", to: "EUR" }.pair(), "USD->EUR");
        assert_eq!(Conversion { from: "", to: "JPY" }.pair(), "unknown->JPY");
    }

    #[test]
    fn test_one_minute_window() {
        let h = harness::<CurrencyAggregator>();
        for _ in 0..3 {
            h.service.conversion("USD", "EUR");
        }
        h.service.conversion("EUR", "USD");
        h.service.conversion("USD", "JPY");
        h.clock.advance(Duration::from_secs(59));
        h.service.conversion("USD", "JPY");
        assert!(h.sink.is_empty());

        h.clock.advance(Duration::from_secs(1));
        h.service.conversion("CAD", "USD");

        let s = &h.sink.summaries()[0];
        assert_eq!(s.u64_field("total_conversions"), Some(7));
        assert_eq!(s.u64_field("period_ms"), Some(60_000));
        assert_eq!(
            s.field("top_currency_pairs").cloned().unwrap(),
            serde_json::json!([
                {"key": "USD->EUR", "count": 3},
                {"key": "USD->JPY", "count": 2},
                {"key": "CAD->USD", "count": 1},
                {"key": "EUR->USD", "count": 1},
            ])
        );
    }
}
