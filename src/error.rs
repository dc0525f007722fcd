//! Crate-wide error type.
//!
//! Only construction and explicit rendering can fail. Recording events
//! never returns an error: failures on that path are logged and counted.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors returned by fallible `riepilogo` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The aggregator configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The background flush ticker could not be started.
    #[error("failed to start flush timer: {0}")]
    Timer(#[source] std::io::Error),

    /// A record payload could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing a record failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Rendered output was not valid UTF-8.
    #[error("utf8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Error from the Prometheus exporter.
    #[cfg(feature = "prometheus")]
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Result type for `riepilogo` operations.
pub type Result<T> = std::result::Result<T, Error>;
