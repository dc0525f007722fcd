//! Destinations for records.
//!
//! A [`Sink`] receives finished [`Record`]s, summaries and significant
//! events alike, and is responsible for formatting and transport. Aggregators
//! always call the sink after releasing their window lock, so a slow sink
//! delays only the caller that closed the window.
//!
//! | Sink | Description |
//! |------|-------------|
//! | [`TracingSink`] | Forwards records as `tracing` events (default) |
//! | [`CollectingSink`] | Keeps records in memory |
//! | [`FnSink`] | Calls a closure |
//! | [`JsonSink`] | Writes one JSON object per line |
//! | [`TableSink`](table::TableSink) | Renders records as tables (feature `table`) |
//!
//! # Examples
//!
//! ```rust
//! use riepilogo::sink::{CollectingSink, Sink};
//! use riepilogo::record::{Record, RecordKind, Severity};
//!
//! let sink = CollectingSink::new();
//! let record = Record::new(
//!     RecordKind::Event, Severity::Info, "demo", "ping", "Ping", 0, &(),
//! ).unwrap();
//!
//! sink.emit(&record);
//! assert_eq!(sink.len(), 1);
//! ```

mod json;

#[cfg(feature = "table")]
pub mod table;

pub use json::JsonSink;

use crate::record::{Record, RecordKind, Severity};
use parking_lot::Mutex;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Receives finished records.
pub trait Sink: Send + Sync {
    /// Records or forwards `record`. Must not panic; failures are the
    /// sink's to report.
    fn emit(&self, record: &Record);
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn emit(&self, record: &Record) {
        (**self).emit(record)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn emit(&self, record: &Record) {
        (**self).emit(record)
    }
}

/// Forwards records to `tracing` at the matching level.
///
/// Every record becomes one event with target `riepilogo::record` and the
/// fields `kind`, `source`, `event_type` and `fields` (the JSON payload).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for TracingSink {
    fn emit(&self, record: &Record) {
        let fields = serde_json::Value::Object(record.fields.clone());
        match record.severity {
            Severity::Info => tracing::info!(
                target: "riepilogo::record",
                kind = %record.kind,
                source = record.source,
                event_type = record.event_type,
                fields = %fields,
                "{}",
                record.message
            ),
            Severity::Warn => tracing::warn!(
                target: "riepilogo::record",
                kind = %record.kind,
                source = record.source,
                event_type = record.event_type,
                fields = %fields,
                "{}",
                record.message
            ),
            Severity::Error => tracing::error!(
                target: "riepilogo::record",
                kind = %record.kind,
                source = record.source,
                event_type = record.event_type,
                fields = %fields,
                "{}",
                record.message
            ),
        }
    }
}

/// Keeps every record in memory.
///
/// Useful in tests and for hosts that ship records in batches.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<Record>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every record received so far.
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    /// Removes and returns every record received so far.
    pub fn take(&self) -> Vec<Record> {
        std::mem::take(&mut *self.records.lock())
    }

    /// Returns the summary records received so far.
    pub fn summaries(&self) -> Vec<Record> {
        self.of_kind(RecordKind::Summary)
    }

    /// Returns the event records received so far.
    pub fn events(&self) -> Vec<Record> {
        self.of_kind(RecordKind::Event)
    }

    fn of_kind(&self, kind: RecordKind) -> Vec<Record> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Sink for CollectingSink {
    fn emit(&self, record: &Record) {
        self.records.lock().push(record.clone());
    }
}

/// Adapts a closure into a [`Sink`].
///
/// ```rust
/// use riepilogo::sink::FnSink;
///
/// let sink = FnSink::new(|record: &riepilogo::record::Record| {
///     eprintln!("{} {}", record.event_type, record.message);
/// });
/// ```
pub struct FnSink<F> {
    f: F,
}

impl<F> FnSink<F>
where
    F: Fn(&Record) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Sink for FnSink<F>
where
    F: Fn(&Record) + Send + Sync,
{
    fn emit(&self, record: &Record) {
        (self.f)(record)
    }
}

impl<F> Debug for FnSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSink").finish_non_exhaustive()
    }
}
