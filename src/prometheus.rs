//! Prometheus exposition of aggregator self-metrics.
//!
//! [`StatsExporter`] renders one or more [`StatsSnapshot`]s in the Prometheus
//! text format. Every counter of a snapshot becomes a sample of an
//! `IntCounterVec`, labeled with the aggregator name:
//!
//! ```text
//! # HELP shop_aggregator_recorded_total Events recorded into windows
//! # TYPE shop_aggregator_recorded_total counter
//! shop_aggregator_recorded_total{aggregator="checkout"} 1200
//! shop_aggregator_recorded_total{aggregator="payment"} 310
//! ```
//!
//! # Feature Flag
//!
//! This module requires the `prometheus` feature:
//!
//! ```toml
//! [dependencies]
//! riepilogo = { version = "0.3", features = ["prometheus"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use riepilogo::prometheus::StatsExporter;
//!
//! let exporter = StatsExporter::new()
//!     .with_namespace("shop")
//!     .with_const_label("env", "production");
//!
//! let text = exporter.render(&[checkout.aggregator().stats(), payment.aggregator().stats()])?;
//! ```

use crate::error::Result;
use crate::stats::StatsSnapshot;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;

const LABEL: &str = "aggregator";

/// Help text per snapshot counter.
const COUNTERS: [(&str, &str); 5] = [
    ("recorded", "Events recorded into windows"),
    ("summaries", "Summary records handed to the sink"),
    ("skipped", "Windows closed empty and suppressed"),
    ("events", "Significant events passed straight through"),
    ("dropped", "Records dropped because they failed to serialize"),
];

/// Renders aggregator statistics in the Prometheus text format.
#[derive(Debug, Clone, Default)]
pub struct StatsExporter {
    namespace: Option<String>,
    const_labels: HashMap<String, String>,
}

impl StatsExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes every metric name with `namespace_`.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(sanitize_name(namespace));
        self
    }

    /// Adds a constant label to every metric.
    pub fn with_const_label(mut self, name: &str, value: &str) -> Self {
        self.const_labels
            .insert(name.to_string(), value.to_string());
        self
    }

    fn full_name(&self, counter: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}_{LABEL}_{counter}_total"),
            None => format!("{LABEL}_{counter}_total"),
        }
    }

    /// Renders `snapshots` into a fresh registry and encodes it.
    ///
    /// # Errors
    ///
    /// Returns an error if a constant label is named `aggregator`, or if a
    /// metric cannot be created or registered.
    pub fn render(&self, snapshots: &[StatsSnapshot]) -> Result<String> {
        if self.const_labels.contains_key(LABEL) {
            return Err(prometheus::Error::Msg(format!(
                "constant label `{LABEL}` clashes with the per-aggregator label"
            ))
            .into());
        }

        let registry = Registry::new();

        for (counter, help) in COUNTERS {
            let opts = Opts::new(self.full_name(counter), help)
                .const_labels(self.const_labels.clone());
            let vec = IntCounterVec::new(opts, &[LABEL])?;
            registry.register(Box::new(vec.clone()))?;

            for snapshot in snapshots {
                let value = snapshot.get(counter).unwrap_or_default();
                vec.with_label_values(&[snapshot.name.as_str()])
                    .inc_by(value);
            }
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Prometheus names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`.
fn sanitize_name(name: &str) -> String {
    let mut result: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect();
    if result.is_empty() || result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}
