//! Records handed to a [`Sink`](crate::sink::Sink).
//!
//! A [`Record`] is either the periodic summary of a closed window or a single
//! significant event passed straight through (a completed order, a failure).
//! Payloads start life as typed, `Serialize` structs and are flattened into
//! a JSON object once, when the record is built; after that a record is
//! immutable.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::{self, Display};

/// Discriminates periodic summaries from individual events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Summary of a closed aggregation window.
    Summary,
    /// A single significant event, never aggregated.
    Event,
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Summary => f.write_str("summary"),
            RecordKind::Event => f.write_str("event"),
        }
    }
}

/// Record severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warn,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warn => f.write_str("warn"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// An individual event that bypasses aggregation.
///
/// Implementors are plain structs whose serialized fields become the record
/// fields.
///
/// ```rust
/// use riepilogo::record::{Severity, Significant};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct PaymentFailed<'a> {
///     order_id: &'a str,
///     error: &'a str,
/// }
///
/// impl Significant for PaymentFailed<'_> {
///     const EVENT_TYPE: &'static str = "payment_failed";
///
///     fn message(&self) -> &'static str {
///         "Failed to charge card"
///     }
///
///     fn severity(&self) -> Severity {
///         Severity::Error
///     }
/// }
/// ```
pub trait Significant: Serialize {
    /// The `event_type` discriminator of the record.
    const EVENT_TYPE: &'static str;

    /// Human-readable message.
    fn message(&self) -> &'static str;

    /// Severity of the record.
    fn severity(&self) -> Severity {
        Severity::Info
    }
}

/// An immutable, structured record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Summary or single event.
    pub kind: RecordKind,
    pub severity: Severity,
    /// Name of the aggregator that produced the record.
    pub source: &'static str,
    /// Type discriminator, e.g. `order_stats_summary` or `payment_failed`.
    pub event_type: &'static str,
    pub message: &'static str,
    /// Wall-clock generation time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Named payload fields.
    pub fields: Map<String, Value>,
}

impl Record {
    /// Builds a record from a serializable payload.
    ///
    /// A payload that does not serialize to a JSON object is stored under
    /// the `value` field.
    pub fn new<P: Serialize + ?Sized>(
        kind: RecordKind,
        severity: Severity,
        source: &'static str,
        event_type: &'static str,
        message: &'static str,
        timestamp_ms: u64,
        payload: &P,
    ) -> serde_json::Result<Self> {
        let fields = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Ok(Self {
            kind,
            severity,
            source,
            event_type,
            message,
            timestamp_ms,
            fields,
        })
    }

    /// Builds an event record from a [`Significant`] payload.
    pub fn event<E: Significant>(
        source: &'static str,
        timestamp_ms: u64,
        event: &E,
    ) -> serde_json::Result<Self> {
        Self::new(
            RecordKind::Event,
            event.severity(),
            source,
            E::EVENT_TYPE,
            event.message(),
            timestamp_ms,
            event,
        )
    }

    /// Returns a payload field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns a payload field as `u64`.
    pub fn u64_field(&self, name: &str) -> Option<u64> {
        self.field(name).and_then(Value::as_u64)
    }

    /// Returns a payload field as `f64`.
    pub fn f64_field(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(Value::as_f64)
    }

    /// Returns a payload field as `&str`.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    pub fn is_summary(&self) -> bool {
        self.kind == RecordKind::Summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct ShippingError<'a> {
        address_region: &'a str,
        error: &'a str,
    }

    impl Significant for ShippingError<'_> {
        const EVENT_TYPE: &'static str = "shipping_error";

        fn message(&self) -> &'static str {
            "Failed to create shipping order"
        }

        fn severity(&self) -> Severity {
            Severity::Error
        }
    }

    #[test]
    fn test_event_record() {
        let record = Record::event(
            "shipping",
            42,
            &ShippingError {
                address_region: "CA",
                error: "carrier timeout",
            },
        )
        .unwrap();

        assert_eq!(record.kind, RecordKind::Event);
        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.event_type, "shipping_error");
        assert_eq!(record.timestamp_ms, 42);
        assert_eq!(record.str_field("address_region"), Some("CA"));
        assert_eq!(record.str_field("error"), Some("carrier timeout"));
        assert!(!record.is_summary());
    }

    #[test]
    fn test_non_object_payload() {
        let record = Record::new(
            RecordKind::Summary,
            Severity::Info,
            "test",
            "scalar",
            "scalar payload",
            0,
            &7u64,
        )
        .unwrap();
        assert_eq!(record.u64_field("value"), Some(7));

        let empty =
            Record::new(RecordKind::Event, Severity::Info, "test", "unit", "m", 0, &()).unwrap();
        assert!(empty.fields.is_empty());
    }

    #[test]
    fn test_serialize_record() {
        let record = Record::new(
            RecordKind::Summary,
            Severity::Warn,
            "ad",
            "ad_stats_summary",
            "Ad service summary",
            1_700_000_000_000,
            &serde_json::json!({ "errors": 2 }),
        )
        .unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""kind":"summary""#));
        assert!(json.contains(r#""severity":"warn""#));
        assert!(json.contains(r#""errors":2"#));
    }

    #[test]
    fn test_severity_order_and_display() {
        assert!(Severity::Error > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
        assert_eq!(Severity::Warn.to_string(), "warn");
        assert_eq!(RecordKind::Event.to_string(), "event");
    }
}
