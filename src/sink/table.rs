//! Table rendering for human operators.
//!
//! [`TableSink`] renders each record as a two-column table using the
//! `tabled` crate: a title line with the record header, then one row per
//! payload field. Nested maps and lists are flattened into dotted paths
//! (`currencies.USD`, `top_viewed[0].key`).
//!
//! # Feature Flag
//!
//! This module requires the `table` feature:
//!
//! ```toml
//! [dependencies]
//! riepilogo = { version = "0.3", features = ["table"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use riepilogo::sink::table::{TableSink, TableStyle};
//!
//! let sink = TableSink::stdout().with_style(TableStyle::Rounded);
//! // [info] catalog product_views_summary (summary) - Product views summary
//! // ╭─────────────────┬────────────╮
//! // │ Field           │ Value      │
//! // ├─────────────────┼────────────┤
//! // │ event_count     │ 42         │
//! // │ top_viewed[0].key │ OLJCESPC7Z │
//! // ╰─────────────────┴────────────╯
//! ```

use super::Sink;
use crate::record::Record;
use parking_lot::Mutex;
use serde_json::Value;
use std::io::{self, Write};
use tabled::{settings::Style, Table, Tabled};

/// Available table styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    /// ASCII table with simple characters: +, -, |
    Ascii,
    /// Rounded corners (default)
    #[default]
    Rounded,
    /// Sharp corners with box-drawing characters
    Sharp,
    /// Modern style with clean lines
    Modern,
    /// GitHub-flavored Markdown table
    Markdown,
    /// No borders, just spacing
    Blank,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Renders records as tables and writes them to `W`.
#[derive(Debug)]
pub struct TableSink<W> {
    writer: Mutex<W>,
    style: TableStyle,
    show_header: bool,
}

impl TableSink<io::Stdout> {
    /// A sink writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TableSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            style: TableStyle::default(),
            show_header: true,
        }
    }

    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.style = style;
        self
    }

    /// Shows or hides the `Field | Value` header row.
    pub fn with_header(mut self, show: bool) -> Self {
        self.show_header = show;
        self
    }

    /// Renders `record` as a title line followed by its field table.
    pub fn render(&self, record: &Record) -> String {
        let mut rows = Vec::new();
        for (name, value) in &record.fields {
            flatten(name.clone(), value, &mut rows);
        }

        let mut table = Table::new(&rows);
        apply_style(&mut table, self.style);
        if !self.show_header {
            table.with(tabled::settings::Remove::row(
                tabled::settings::object::Rows::first(),
            ));
        }

        format!(
            "[{}] {} {} ({}) - {}\n{}",
            record.severity, record.source, record.event_type, record.kind, record.message, table
        )
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> Sink for TableSink<W> {
    fn emit(&self, record: &Record) {
        let rendered = self.render(record);
        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "{}", rendered) {
            tracing::warn!(error = %e, source = record.source, "failed to write table");
        }
    }
}

fn apply_style(table: &mut Table, style: TableStyle) {
    match style {
        TableStyle::Ascii => {
            table.with(Style::ascii());
        }
        TableStyle::Rounded => {
            table.with(Style::rounded());
        }
        TableStyle::Sharp => {
            table.with(Style::sharp());
        }
        TableStyle::Modern => {
            table.with(Style::modern());
        }
        TableStyle::Markdown => {
            table.with(Style::markdown());
        }
        TableStyle::Blank => {
            table.with(Style::blank());
        }
    }
}

/// Flattens `value` into rows under `path`.
fn flatten(path: String, value: &Value, rows: &mut Vec<FieldRow>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, nested) in map {
                flatten(format!("{}.{}", path, key), nested, rows);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, nested) in items.iter().enumerate() {
                flatten(format!("{}[{}]", path, i), nested, rows);
            }
        }
        Value::String(s) => rows.push(FieldRow {
            field: path,
            value: s.clone(),
        }),
        other => rows.push(FieldRow {
            field: path,
            value: other.to_string(),
        }),
    }
}
