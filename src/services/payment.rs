//! Payment health for the payment service.
//!
//! Every transaction is passed through individually and counted into a
//! five minute health window.

use super::service_facade;
use crate::aggregator::{Aggregator, Metrics};
use crate::config::{AggregatorConfig, DEFAULT_WINDOW};
use crate::dimension::{key_or_unknown, DimensionCounts};
use crate::domain::Money;
use crate::record::{Severity, Significant};
use crate::summary::{percentage, SummaryContext};
use serde::Serialize;
use std::collections::BTreeMap;

/// One charge attempt.
#[derive(Debug, Clone, Copy)]
pub struct Transaction<'a> {
    pub success: bool,
    pub amount: &'a Money,
    /// Card network, e.g. `visa`.
    pub card_type: &'a str,
    pub card_last_four: &'a str,
    pub transaction_id: Option<&'a str>,
    pub failure_reason: Option<&'a str>,
}

#[derive(Debug, Default)]
pub struct PaymentHealth {
    transactions: u64,
    successes: u64,
    failures: u64,
    card_types: DimensionCounts,
}

#[derive(Debug, Serialize)]
pub struct PaymentHealthSummary {
    pub total_transactions: u64,
    /// Successful transactions in percent; `null` without transactions.
    pub success_rate: Option<f64>,
    pub failure_count: u64,
    pub card_types: BTreeMap<String, u64>,
}

impl Metrics for PaymentHealth {
    type Event<'a> = Transaction<'a>;
    type Summary = PaymentHealthSummary;

    const SOURCE: &'static str = "payment";
    const SUMMARY_EVENT: &'static str = "payment_health_metrics";
    const SUMMARY_MESSAGE: &'static str = "Payment Service Health Report";

    fn apply(&mut self, tx: Transaction<'_>) {
        self.transactions += 1;
        if tx.success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.card_types.incr(tx.card_type);
    }

    fn summarize(&self, _: &SummaryContext) -> PaymentHealthSummary {
        PaymentHealthSummary {
            total_transactions: self.transactions,
            success_rate: percentage(self.successes, self.transactions),
            failure_count: self.failures,
            card_types: self.card_types.sorted(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionAmount<'a> {
    pub value: f64,
    pub currency: &'a str,
}

#[derive(Debug, Serialize)]
pub struct TransactionDetails<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<&'a str>,
    /// `success` or `failed`.
    pub status: &'static str,
    pub amount: TransactionAmount<'a>,
    pub card_type: &'a str,
    pub card_last_four: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct PaymentTransaction<'a> {
    pub transaction_details: TransactionDetails<'a>,
}

impl<'a> PaymentTransaction<'a> {
    fn from_transaction(tx: &Transaction<'a>) -> Self {
        Self {
            transaction_details: TransactionDetails {
                transaction_id: tx.transaction_id,
                status: if tx.success { "success" } else { "failed" },
                amount: TransactionAmount {
                    value: tx.amount.amount(),
                    currency: tx.amount.currency(),
                },
                card_type: key_or_unknown(Some(tx.card_type)),
                card_last_four: tx.card_last_four,
                failure_reason: tx.failure_reason,
            },
        }
    }

    fn succeeded(&self) -> bool {
        self.transaction_details.status == "success"
    }
}

impl Significant for PaymentTransaction<'_> {
    const EVENT_TYPE: &'static str = "payment_transaction";

    fn message(&self) -> &'static str {
        if self.succeeded() {
            "Payment processed successfully"
        } else {
            "Payment processing failed"
        }
    }

    fn severity(&self) -> Severity {
        if self.succeeded() {
            Severity::Info
        } else {
            Severity::Warn
        }
    }
}

/// Payment business events.
#[derive(Debug, Clone)]
pub struct PaymentAggregator {
    inner: Aggregator<PaymentHealth>,
}

service_facade!(
    PaymentAggregator,
    PaymentHealth,
    AggregatorConfig::new().with_window(DEFAULT_WINDOW)
);

impl PaymentAggregator {
    /// Passes `tx` through and counts it.
    pub fn transaction(&self, tx: &Transaction<'_>) {
        self.inner.emit(&PaymentTransaction::from_transaction(tx));
        self.inner.record(*tx);
    }
}
