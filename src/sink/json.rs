//! JSON lines sink.
//!
//! [`JsonSink`] serializes every record to a single JSON object and writes it
//! to any [`Write`] implementation followed by a newline, which is what most
//! log shippers expect.
//!
//! ```rust
//! use riepilogo::record::{Record, RecordKind, Severity};
//! use riepilogo::sink::{JsonSink, Sink};
//!
//! let sink = JsonSink::new(Vec::new());
//! let record = Record::new(
//!     RecordKind::Event, Severity::Warn, "catalog", "product_not_found",
//!     "Product not found", 0, &serde_json::json!({"product_id": "XYZ"}),
//! ).unwrap();
//!
//! sink.emit(&record);
//! let out = String::from_utf8(sink.into_inner()).unwrap();
//! assert!(out.ends_with("}\n"));
//! assert!(out.contains(r#""product_id":"XYZ""#));
//! ```

use super::Sink;
use crate::error::Result;
use crate::record::Record;
use parking_lot::Mutex;
use std::io::{self, Write};

/// Writes records as JSON lines.
#[derive(Debug)]
pub struct JsonSink<W> {
    writer: Mutex<W>,
    pretty: bool,
}

impl JsonSink<io::Stdout> {
    /// A sink writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            pretty: false,
        }
    }

    /// Enables or disables pretty-printing.
    ///
    /// Pretty output spans several lines per record.
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.pretty = enabled;
        self
    }

    /// Serializes `record` to a string without writing it.
    pub fn to_json(&self, record: &Record) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(record)?
        } else {
            serde_json::to_string(record)?
        };
        Ok(json)
    }

    /// Writes `record`, returning any serialization or I/O error.
    pub fn try_emit(&self, record: &Record) -> Result<()> {
        let mut line = self.to_json(record)?;
        line.push('\n');
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> Sink for JsonSink<W> {
    fn emit(&self, record: &Record) {
        if let Err(e) = self.try_emit(record) {
            tracing::warn!(
                error = %e,
                source = record.source,
                event_type = record.event_type,
                "failed to write record"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordKind, Severity};

    fn record(event_type: &'static str) -> Record {
        Record::new(
            RecordKind::Summary,
            Severity::Info,
            "shipping",
            event_type,
            "Shipping statistics summary",
            1_000,
            &serde_json::json!({"quote_requests": 3}),
        )
        .unwrap()
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_json_lines() {
        let sink = JsonSink::new(Vec::new());
        sink.emit(&record("a"));
        sink.emit(&record("b"));

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event_type"], "a");
        assert_eq!(first["kind"], "summary");
        assert_eq!(first["fields"]["quote_requests"], 3);
        assert_eq!(first["timestamp_ms"], 1_000);
    }

    #[test]
    fn test_pretty() {
        let sink = JsonSink::new(Vec::new()).pretty(true);
        let json = sink.to_json(&record("p")).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("  \"kind\": \"summary\""));
    }

    #[test]
    fn test_write_error_is_reported_not_raised() {
        let sink = JsonSink::new(FailingWriter);
        assert!(sink.try_emit(&record("x")).is_err());
        // The infallible path swallows the error.
        sink.emit(&record("x"));
    }
}
