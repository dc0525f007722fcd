//! # Riepilogo - Windowed Business-Metrics Aggregators
//!
//! Services that log every business event individually drown their log
//! pipeline at high request rates. `riepilogo` counts those events into an
//! in-memory **window** instead, and periodically turns the window into a
//! single structured **summary record**: order counts and success rates,
//! totals per currency, top-N products, error breakdowns.
//!
//! Rare events that matter on their own (a failed payment, a missing
//! product) bypass the window and are emitted immediately as **significant
//! events**.
//!
//! ## How It Works
//!
//! Each [`Aggregator`] owns one window behind a single lock. Recording an
//! event updates the window's counters and asks the flush policy whether
//! the window should close:
//!
//! | Policy | Closes when |
//! |--------|-------------|
//! | time only | the window is older than its period |
//! | time or count | the window is older than its period, or holds `batch_size` events |
//! | timer | a background ticker finds the window a full period old, or the window holds `batch_size` events |
//!
//! Building the summary and resetting the window happen under the same
//! lock, so no event is counted twice or lost between windows. The summary
//! is handed to a [`Sink`] after the lock is released.
//!
//! ## Record Shape
//!
//! Every emitted [`Record`] carries a fixed envelope and its payload
//! fields, e.g. as written by [`JsonSink`]:
//!
//! ```text
//! {"kind":"summary","severity":"info","source":"checkout","event_type":"order_stats_summary",
//!  "message":"Order statistics summary","timestamp_ms":1700000300000,
//!  "fields":{"period_ms":300000,"event_count":3,"trigger":"elapsed",
//!            "order_count":3,"success_count":2,"failure_count":1,"success_rate":66.67, ...}}
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use riepilogo::domain::Money;
//! use riepilogo::services::checkout::{CheckoutAggregator, Order, OrderStatus};
//! use riepilogo::services::Service;
//! use riepilogo::sink::CollectingSink;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(CollectingSink::new());
//! let checkout = CheckoutAggregator::start(Arc::clone(&sink)).unwrap();
//!
//! let total = Money::new("USD", 42, 500_000_000);
//! checkout.record_order(&Order {
//!     order_id: "order-1",
//!     user_id: "user-1",
//!     total: &total,
//!     currency: "USD",
//!     item_count: 3,
//!     transaction_id: "tx-1",
//!     status: OrderStatus::Completed,
//! });
//! checkout.aggregator().flush();
//!
//! // The completed order was passed through, then summarized.
//! assert_eq!(sink.events()[0].event_type, "order_completed");
//! assert_eq!(sink.summaries()[0].u64_field("order_count"), Some(1));
//! ```
//!
//! ## Disabled Handles
//!
//! A disabled aggregator (see [`Aggregator::disabled`]) accepts every call
//! and does nothing, so instrumentation can stay in place when business
//! metrics are turned off.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `table` | [`sink::table::TableSink`], human readable records via `tabled` |
//! | `prometheus` | [`prometheus::StatsExporter`] for aggregator self-metrics |
//! | `full` | All of the above |
//! | `demo` | `full` plus the dependencies of the storefront demo |

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod counters;
pub mod dimension;
pub mod domain;
pub mod error;
pub mod policy;
pub mod rank;
pub mod record;
pub mod services;
pub mod sink;
pub mod stats;
pub mod summary;
pub mod window;

mod ticker;

#[cfg(feature = "prometheus")]
pub mod prometheus;

pub use aggregator::{Aggregator, AggregatorBuilder, Metrics};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AggregatorConfig, EmptyWindow, FlushMode};
pub use error::{Error, Result};
pub use record::{Record, RecordKind, Severity, Significant};
pub use sink::{CollectingSink, FnSink, JsonSink, Sink, TracingSink};
pub use stats::StatsSnapshot;
pub use summary::{SummaryContext, Trigger};
