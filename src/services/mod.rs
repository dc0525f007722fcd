//! Ready-made aggregators for the storefront services.
//!
//! Each service module defines three things:
//!
//! - the window counters, a [`Metrics`] implementation,
//! - the significant events it passes straight through, as
//!   [`Significant`](crate::record::Significant) structs,
//! - a façade with one typed method per business event, so request
//!   handlers never build field bags by hand.
//!
//! | Service | Window | Summary `event_type` |
//! |---------|--------|----------------------|
//! | [`checkout`] | 5 min, lazy | `order_stats_summary` |
//! | [`shipping`] | 5 min or 100 events, lazy | `shipping_stats_summary` |
//! | [`catalog`] | 5 min, lazy | `product_views_summary` |
//! | [`storefront`] | 5 min, timer | `business_metrics_report` |
//! | [`email`] | 5 min or 50 events, lazy | `email_stats_summary` |
//! | [`payment`] | 5 min, lazy | `payment_health_metrics` |
//! | [`currency`] | 1 min, lazy | `currency_conversion_metrics` |
//! | [`recommendation`] | 1 min timer or 20 events | `recommendation_stats` |
//! | [`cart`] | 5 min, timer | `cart_stats_summary` |
//! | [`ad`] | 5 min, lazy | `ad_stats_summary` |
//!
//! # Examples
//!
//! ```rust
//! use riepilogo::services::{checkout::CheckoutAggregator, Service};
//! use riepilogo::sink::CollectingSink;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(CollectingSink::new());
//! let checkout = CheckoutAggregator::start(Arc::clone(&sink)).unwrap();
//! checkout.payment_failed("order-1", "card declined");
//!
//! assert_eq!(sink.events()[0].event_type, "payment_failed");
//! ```

pub mod ad;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod currency;
pub mod email;
pub mod payment;
pub mod recommendation;
pub mod shipping;
pub mod storefront;

use crate::aggregator::{Aggregator, AggregatorBuilder, Metrics};
use crate::config::AggregatorConfig;
use crate::error::Result;
use crate::sink::Sink;

/// A typed façade over one [`Aggregator`].
pub trait Service: Sized {
    /// The window counters of this service.
    type Metrics: Metrics;

    /// The window policy the service ships with.
    fn default_config() -> AggregatorConfig;

    /// Wraps an already built aggregator.
    fn from_aggregator(aggregator: Aggregator<Self::Metrics>) -> Self;

    /// The underlying aggregator.
    fn aggregator(&self) -> &Aggregator<Self::Metrics>;

    /// A builder preloaded with [`Service::default_config`].
    fn builder() -> AggregatorBuilder<Self::Metrics> {
        Aggregator::builder().config(Self::default_config())
    }

    /// Builds the service aggregator with its default policy and `sink`.
    fn start<S: Sink + 'static>(sink: S) -> Result<Self> {
        Self::builder().sink(sink).build().map(Self::from_aggregator)
    }

    /// A façade whose every call is a no-op.
    fn disabled() -> Self {
        Self::from_aggregator(Aggregator::disabled())
    }
}

/// Implements the façade boilerplate for a newtype over `Aggregator<$metrics>`.
macro_rules! service_facade {
    ($facade:ident, $metrics:ty, $config:expr) => {
        impl $crate::services::Service for $facade {
            type Metrics = $metrics;

            fn default_config() -> $crate::config::AggregatorConfig {
                $config
            }

            fn from_aggregator(aggregator: $crate::aggregator::Aggregator<$metrics>) -> Self {
                Self { inner: aggregator }
            }

            fn aggregator(&self) -> &$crate::aggregator::Aggregator<$metrics> {
                &self.inner
            }
        }

        impl Default for $facade {
            fn default() -> Self {
                <Self as $crate::services::Service>::disabled()
            }
        }
    };
}

pub(crate) use service_facade;
