//! Delivery statistics for the email service.

use super::service_facade;
use crate::aggregator::{Aggregator, Metrics};
use crate::config::{AggregatorConfig, DEFAULT_WINDOW};
use crate::dimension::{key_or_unknown, DimensionCounts};
use crate::record::{Severity, Significant};
use crate::summary::SummaryContext;
use serde::Serialize;
use std::collections::BTreeMap;

/// Domain part of an address, or `"unknown"` without an `@`.
///
/// ```rust
/// use riepilogo::services::email::email_domain;
///
/// assert_eq!(email_domain("someone@example.com"), "example.com");
/// assert_eq!(email_domain("not-an-address"), "unknown");
/// ```
pub fn email_domain(email: &str) -> &str {
    key_or_unknown(email.split('@').nth(1))
}

#[derive(Debug, Clone, Copy)]
pub enum EmailEvent<'a> {
    Sent { domain: &'a str },
    Failed,
    TemplateError,
}

#[derive(Debug, Default)]
pub struct EmailStats {
    sent: u64,
    failed: u64,
    template_errors: u64,
    domains: DimensionCounts,
}

#[derive(Debug, Serialize)]
pub struct EmailStatsSummary {
    pub emails_sent: u64,
    pub emails_failed: u64,
    pub template_errors: u64,
    /// Sent emails per recipient domain.
    pub domain_stats: BTreeMap<String, u64>,
}

impl Metrics for EmailStats {
    type Event<'a> = EmailEvent<'a>;
    type Summary = EmailStatsSummary;

    const SOURCE: &'static str = "email";
    const SUMMARY_EVENT: &'static str = "email_stats_summary";
    const SUMMARY_MESSAGE: &'static str = "Email service statistics summary";

    fn apply(&mut self, event: EmailEvent<'_>) {
        match event {
            EmailEvent::Sent { domain } => {
                self.sent += 1;
                self.domains.incr(domain);
            }
            EmailEvent::Failed => self.failed += 1,
            EmailEvent::TemplateError => self.template_errors += 1,
        }
    }

    fn summarize(&self, _: &SummaryContext) -> EmailStatsSummary {
        EmailStatsSummary {
            emails_sent: self.sent,
            emails_failed: self.failed,
            template_errors: self.template_errors,
            domain_stats: self.domains.sorted(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmailSendFailed<'a> {
    pub email_domain: &'a str,
    pub error: &'a str,
}

impl Significant for EmailSendFailed<'_> {
    const EVENT_TYPE: &'static str = "email_send_failed";

    fn message(&self) -> &'static str {
        "Failed to send email"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateRenderFailed<'a> {
    pub error: &'a str,
}

impl Significant for TemplateRenderFailed<'_> {
    const EVENT_TYPE: &'static str = "template_render_failed";

    fn message(&self) -> &'static str {
        "Template rendering failed"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

/// Email business events.
#[derive(Debug, Clone)]
pub struct EmailAggregator {
    inner: Aggregator<EmailStats>,
}

service_facade!(
    EmailAggregator,
    EmailStats,
    AggregatorConfig::new()
        .with_window(DEFAULT_WINDOW)
        .with_batch_size(50)
);

impl EmailAggregator {
    pub fn sent(&self, email: &str) {
        self.inner.record(EmailEvent::Sent {
            domain: email_domain(email),
        });
    }

    /// Counts a failed send and passes it through.
    pub fn send_failed(&self, email: &str, error: &str) {
        self.inner.record(EmailEvent::Failed);
        self.inner.emit(&EmailSendFailed {
            email_domain: email_domain(email),
            error,
        });
    }

    /// Counts a template error and passes it through.
    pub fn template_error(&self, error: &str) {
        self.inner.record(EmailEvent::TemplateError);
        self.inner.emit(&TemplateRenderFailed { error });
    }
}
