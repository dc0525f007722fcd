//! Cart activity for the cart service.

use super::service_facade;
use crate::aggregator::{Aggregator, Metrics};
use crate::config::{AggregatorConfig, EmptyWindow, FlushMode, DEFAULT_WINDOW};
use crate::dimension::DimensionCounts;
use crate::rank::Ranked;
use crate::record::{Severity, Significant};
use crate::summary::SummaryContext;
use serde::Serialize;
use std::collections::HashSet;

/// Carts with more items than this are passed through when viewed.
pub const LARGE_CART_ITEMS: u32 = 10;

/// Additions of more units than this are passed through.
pub const LARGE_QUANTITY: u32 = 5;

#[derive(Debug, Clone, Copy)]
pub enum CartEvent<'a> {
    View { user_id: &'a str },
    Add { user_id: &'a str, product_id: &'a str, quantity: u32 },
    Empty { user_id: &'a str },
}

#[derive(Debug, Default)]
pub struct CartActivity {
    views: u64,
    additions: u64,
    empties: u64,
    users: HashSet<String>,
    items_added: u64,
    product_additions: DimensionCounts,
}

impl CartActivity {
    fn saw_user(&mut self, user_id: &str) {
        if !self.users.contains(user_id) {
            self.users.insert(user_id.to_owned());
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartStatsSummary {
    pub view_count: u64,
    pub add_count: u64,
    pub empty_count: u64,
    pub unique_users: usize,
    pub total_items_added: u64,
    /// Products by units added, highest first.
    pub top_products: Vec<Ranked>,
}

impl Metrics for CartActivity {
    type Event<'a> = CartEvent<'a>;
    type Summary = CartStatsSummary;

    const SOURCE: &'static str = "cart";
    const SUMMARY_EVENT: &'static str = "cart_stats_summary";
    const SUMMARY_MESSAGE: &'static str = "Cart statistics summary";

    fn apply(&mut self, event: CartEvent<'_>) {
        match event {
            CartEvent::View { user_id } => {
                self.views += 1;
                self.saw_user(user_id);
            }
            CartEvent::Add {
                user_id,
                product_id,
                quantity,
            } => {
                self.additions += 1;
                self.saw_user(user_id);
                self.items_added += u64::from(quantity);
                self.product_additions.add(product_id, u64::from(quantity));
            }
            CartEvent::Empty { user_id } => {
                self.empties += 1;
                self.saw_user(user_id);
            }
        }
    }

    fn summarize(&self, ctx: &SummaryContext) -> CartStatsSummary {
        CartStatsSummary {
            view_count: self.views,
            add_count: self.additions,
            empty_count: self.empties,
            unique_users: self.users.len(),
            total_items_added: self.items_added,
            top_products: self.product_additions.top(ctx.top_n),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LargeCartView<'a> {
    pub user_id: &'a str,
    pub cart_id: &'a str,
    pub total_items: u32,
}

impl Significant for LargeCartView<'_> {
    const EVENT_TYPE: &'static str = "large_cart_view";

    fn message(&self) -> &'static str {
        "Large cart viewed"
    }
}

#[derive(Debug, Serialize)]
pub struct LargeQuantityAddition<'a> {
    pub user_id: &'a str,
    pub product_id: &'a str,
    pub quantity: u32,
}

impl Significant for LargeQuantityAddition<'_> {
    const EVENT_TYPE: &'static str = "large_quantity_addition";

    fn message(&self) -> &'static str {
        "Large quantity added to cart"
    }
}

/// Cart operations that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOperation {
    View,
    Add,
    Empty,
}

macro_rules! cart_error {
    ($name:ident, $event_type:literal, $message:literal) => {
        #[derive(Debug, Serialize)]
        pub struct $name<'a> {
            pub user_id: &'a str,
            pub error: &'a str,
        }

        impl Significant for $name<'_> {
            const EVENT_TYPE: &'static str = $event_type;

            fn message(&self) -> &'static str {
                $message
            }

            fn severity(&self) -> Severity {
                Severity::Error
            }
        }
    };
}

cart_error!(ViewCartError, "view_cart_error", "Failed to view cart");
cart_error!(AddToCartError, "add_to_cart_error", "Failed to add item to cart");
cart_error!(EmptyCartError, "empty_cart_error", "Failed to empty cart");

/// Cart business events.
#[derive(Debug, Clone)]
pub struct CartAggregator {
    inner: Aggregator<CartActivity>,
}

service_facade!(
    CartAggregator,
    CartActivity,
    AggregatorConfig::new()
        .with_window(DEFAULT_WINDOW)
        .with_mode(FlushMode::Timer)
        .with_empty_window(EmptyWindow::Skip)
);

impl CartAggregator {
    pub fn view(&self, user_id: &str, cart_id: &str, total_items: u32) {
        self.inner.record(CartEvent::View { user_id });
        if total_items > LARGE_CART_ITEMS {
            self.inner.emit(&LargeCartView {
                user_id,
                cart_id,
                total_items,
            });
        }
    }

    pub fn add(&self, user_id: &str, product_id: &str, quantity: u32) {
        self.inner.record(CartEvent::Add {
            user_id,
            product_id,
            quantity,
        });
        if quantity > LARGE_QUANTITY {
            self.inner.emit(&LargeQuantityAddition {
                user_id,
                product_id,
                quantity,
            });
        }
    }

    pub fn empty(&self, user_id: &str) {
        self.inner.record(CartEvent::Empty { user_id });
    }

    /// Passes through a failed cart operation as `<operation>_error`.
    pub fn error(&self, operation: CartOperation, user_id: &str, error: &str) {
        match operation {
            CartOperation::View => self.inner.emit(&ViewCartError { user_id, error }),
            CartOperation::Add => self.inner.emit(&AddToCartError { user_id, error }),
            CartOperation::Empty => self.inner.emit(&EmptyCartError { user_id, error }),
        }
    }
}
