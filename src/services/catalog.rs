//! Product view statistics for the product catalog.

use super::service_facade;
use crate::aggregator::{Aggregator, Metrics};
use crate::config::{AggregatorConfig, DEFAULT_WINDOW};
use crate::dimension::DimensionCounts;
use crate::rank::Ranked;
use crate::record::{Severity, Significant};
use crate::summary::SummaryContext;
use serde::Serialize;

#[derive(Debug, Default)]
pub struct ProductViews {
    views: DimensionCounts,
}

#[derive(Debug, Serialize)]
pub struct ProductViewsSummary {
    pub total_views: u64,
    pub unique_products: usize,
    /// Most viewed products, highest first.
    pub top_viewed: Vec<Ranked>,
}

impl Metrics for ProductViews {
    /// The viewed product id.
    type Event<'a> = &'a str;
    type Summary = ProductViewsSummary;

    const SOURCE: &'static str = "catalog";
    const SUMMARY_EVENT: &'static str = "product_views_summary";
    const SUMMARY_MESSAGE: &'static str = "Product views summary";

    fn apply(&mut self, product_id: &str) {
        self.views.incr(product_id);
    }

    fn summarize(&self, ctx: &SummaryContext) -> ProductViewsSummary {
        ProductViewsSummary {
            total_views: self.views.total(),
            unique_products: self.views.len(),
            top_viewed: self.views.top(ctx.top_n),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductNotFound<'a> {
    pub product_id: &'a str,
}

impl Significant for ProductNotFound<'_> {
    const EVENT_TYPE: &'static str = "product_not_found";

    fn message(&self) -> &'static str {
        "Product not found"
    }

    fn severity(&self) -> Severity {
        Severity::Warn
    }
}

#[derive(Debug, Serialize)]
pub struct ProductSearch<'a> {
    pub query: &'a str,
    pub result_count: usize,
    pub latency_ms: f64,
}

impl Significant for ProductSearch<'_> {
    const EVENT_TYPE: &'static str = "product_search";

    fn message(&self) -> &'static str {
        "Product search performed"
    }
}

/// Outcome of a catalog operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Success,
    Error,
}

/// Name of the operation that reloads the catalog from its source.
pub const RELOAD_CATALOG: &str = "reload_catalog";

#[derive(Debug, Serialize)]
pub struct CatalogOperation<'a> {
    pub operation: &'a str,
    pub product_count: usize,
    pub status: OperationStatus,
}

impl Significant for CatalogOperation<'_> {
    const EVENT_TYPE: &'static str = "catalog_operation";

    fn message(&self) -> &'static str {
        "Catalog operation performed"
    }

    fn severity(&self) -> Severity {
        match self.status {
            OperationStatus::Success => Severity::Info,
            OperationStatus::Error => Severity::Error,
        }
    }
}

/// Product catalog business events.
#[derive(Debug, Clone)]
pub struct CatalogAggregator {
    inner: Aggregator<ProductViews>,
}

service_facade!(
    CatalogAggregator,
    ProductViews,
    AggregatorConfig::new().with_window(DEFAULT_WINDOW)
);

impl CatalogAggregator {
    pub fn product_view(&self, product_id: &str) {
        self.inner.record(product_id);
    }

    pub fn product_not_found(&self, product_id: &str) {
        self.inner.emit(&ProductNotFound { product_id });
    }

    pub fn search(&self, query: &str, result_count: usize, latency_ms: f64) {
        self.inner.emit(&ProductSearch {
            query,
            result_count,
            latency_ms,
        });
    }

    /// Passes through catalog reloads and failed operations; successful
    /// operations of any other kind are dropped.
    pub fn catalog_operation(&self, operation: &str, product_count: usize, status: OperationStatus) {
        if operation == RELOAD_CATALOG || status == OperationStatus::Error {
            self.inner.emit(&CatalogOperation {
                operation,
                product_count,
                status,
            });
        }
    }
}
