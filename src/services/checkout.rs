//! Order statistics for the checkout service.
//!
//! Every placed order, completed or not, is counted into a five minute
//! window. Completed orders are also passed through individually, as are
//! the failures of each checkout step.

use super::service_facade;
use crate::aggregator::{Aggregator, Metrics};
use crate::config::{AggregatorConfig, DEFAULT_WINDOW};
use crate::dimension::DimensionCounts;
use crate::domain::Money;
use crate::record::{Severity, Significant};
use crate::summary::{percentage, SummaryContext};
use serde::Serialize;
use std::collections::BTreeMap;

/// Final state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Completed,
    Failed,
}

/// A placed order.
#[derive(Debug, Clone, Copy)]
pub struct Order<'a> {
    pub order_id: &'a str,
    pub user_id: &'a str,
    pub total: &'a Money,
    /// The user's selected currency.
    pub currency: &'a str,
    pub item_count: u32,
    pub transaction_id: &'a str,
    pub status: OrderStatus,
}

#[derive(Debug, Default)]
pub struct OrderStats {
    order_count: u64,
    success_count: u64,
    failure_count: u64,
    total_amount: f64,
    currencies: DimensionCounts,
}

#[derive(Debug, Serialize)]
pub struct OrderStatsSummary {
    pub order_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub total_amount: f64,
    pub currencies: BTreeMap<String, u64>,
    /// Completed orders as a percentage of all orders; `null` without orders.
    pub success_rate: Option<f64>,
}

impl Metrics for OrderStats {
    type Event<'a> = Order<'a>;
    type Summary = OrderStatsSummary;

    const SOURCE: &'static str = "checkout";
    const SUMMARY_EVENT: &'static str = "order_stats_summary";
    const SUMMARY_MESSAGE: &'static str = "Order statistics summary";

    fn apply(&mut self, order: Order<'_>) {
        self.order_count += 1;
        match order.status {
            OrderStatus::Completed => self.success_count += 1,
            OrderStatus::Failed => self.failure_count += 1,
        }
        self.currencies.incr(order.currency);
        self.total_amount += order.total.amount();
    }

    fn summarize(&self, _: &SummaryContext) -> OrderStatsSummary {
        OrderStatsSummary {
            order_count: self.order_count,
            success_count: self.success_count,
            failure_count: self.failure_count,
            total_amount: self.total_amount,
            currencies: self.currencies.sorted(),
            success_rate: percentage(self.success_count, self.order_count),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderCompleted<'a> {
    pub order_id: &'a str,
    pub user_id: &'a str,
    /// Formatted amount, e.g. `12.99 USD`.
    pub total_amount: String,
    pub currency: &'a str,
    pub item_count: u32,
    pub transaction_id: &'a str,
}

impl Significant for OrderCompleted<'_> {
    const EVENT_TYPE: &'static str = "order_completed";

    fn message(&self) -> &'static str {
        "Order completed successfully"
    }
}

#[derive(Debug, Serialize)]
pub struct CartPreparationFailed<'a> {
    pub user_id: &'a str,
    pub error: &'a str,
}

impl Significant for CartPreparationFailed<'_> {
    const EVENT_TYPE: &'static str = "cart_preparation_failed";

    fn message(&self) -> &'static str {
        "Failed to prepare cart items"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentFailed<'a> {
    pub order_id: &'a str,
    pub error: &'a str,
}

impl Significant for PaymentFailed<'_> {
    const EVENT_TYPE: &'static str = "payment_failed";

    fn message(&self) -> &'static str {
        "Failed to charge card"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

#[derive(Debug, Serialize)]
pub struct ShippingFailed<'a> {
    pub order_id: &'a str,
    pub error: &'a str,
}

impl Significant for ShippingFailed<'_> {
    const EVENT_TYPE: &'static str = "shipping_failed";

    fn message(&self) -> &'static str {
        "Shipping failed"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

#[derive(Debug, Serialize)]
pub struct CartEmptyFailed<'a> {
    pub user_id: &'a str,
    pub error: &'a str,
}

impl Significant for CartEmptyFailed<'_> {
    const EVENT_TYPE: &'static str = "cart_empty_failed";

    fn message(&self) -> &'static str {
        "Failed to empty cart"
    }

    fn severity(&self) -> Severity {
        Severity::Warn
    }
}

#[derive(Debug, Serialize)]
pub struct EmailConfirmationFailed<'a> {
    pub order_id: &'a str,
    pub email: &'a str,
    pub error: &'a str,
}

impl Significant for EmailConfirmationFailed<'_> {
    const EVENT_TYPE: &'static str = "email_confirmation_failed";

    fn message(&self) -> &'static str {
        "Failed to send order confirmation email"
    }

    fn severity(&self) -> Severity {
        Severity::Warn
    }
}

/// Checkout business events.
#[derive(Debug, Clone)]
pub struct CheckoutAggregator {
    inner: Aggregator<OrderStats>,
}

service_facade!(
    CheckoutAggregator,
    OrderStats,
    AggregatorConfig::new().with_window(DEFAULT_WINDOW)
);

impl CheckoutAggregator {
    /// Counts `order` and, when it completed, passes it through.
    pub fn record_order(&self, order: &Order<'_>) {
        self.inner.record(*order);
        if order.status == OrderStatus::Completed {
            self.inner.emit(&OrderCompleted {
                order_id: order.order_id,
                user_id: order.user_id,
                total_amount: order.total.to_string(),
                currency: order.currency,
                item_count: order.item_count,
                transaction_id: order.transaction_id,
            });
        }
    }

    pub fn cart_preparation_failed(&self, user_id: &str, error: &str) {
        self.inner.emit(&CartPreparationFailed { user_id, error });
    }

    pub fn payment_failed(&self, order_id: &str, error: &str) {
        self.inner.emit(&PaymentFailed { order_id, error });
    }

    pub fn shipping_failed(&self, order_id: &str, error: &str) {
        self.inner.emit(&ShippingFailed { order_id, error });
    }

    pub fn cart_empty_failed(&self, user_id: &str, error: &str) {
        self.inner.emit(&CartEmptyFailed { user_id, error });
    }

    pub fn email_confirmation_failed(&self, order_id: &str, email: &str, error: &str) {
        self.inner.emit(&EmailConfirmationFailed {
            order_id,
            email,
            error,
        });
    }
}
