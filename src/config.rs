//! Aggregator configuration.
//!
//! The configuration surface is small: how long a window lives, an optional
//! batch size that closes it early, the top-N limit for ranked breakdowns,
//! who drives time-based flushes, and what to do with an empty window.
//!
//! [`AggregatorConfig`] is a plain serde struct, so hosts can embed it in
//! their own configuration files:
//!
//! ```rust
//! use riepilogo::config::{AggregatorConfig, FlushMode};
//!
//! let config: AggregatorConfig = serde_json::from_str(
//!     r#"{ "window_ms": 60000, "batch_size": 20, "mode": "timer" }"#,
//! ).unwrap();
//!
//! assert_eq!(config.mode, FlushMode::Timer);
//! assert_eq!(config.top_n, 5);
//! config.validate().unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default number of entries kept in ranked breakdowns.
pub const DEFAULT_TOP_N: usize = 5;

/// Who decides that a window is old enough to close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Every `record` call checks the window age. No background thread;
    /// a window with no traffic is never closed.
    #[default]
    Lazy,
    /// A background ticker closes the window every `window`, whether or
    /// not events arrive. `record` only enforces the batch size.
    Timer,
}

/// What a closing window with no activity produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyWindow {
    /// Restart the window without emitting anything.
    #[default]
    Skip,
    /// Emit a summary with zero counters.
    Emit,
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The window length is zero.
    #[error("window duration must be greater than zero")]
    ZeroWindow,

    /// A batch size of zero would close the window on every event.
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,

    /// A top-N limit of zero would rank nothing.
    #[error("top-n limit must be greater than zero")]
    ZeroTopN,
}

/// Configuration of a single aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Window length (and ticker period in [`FlushMode::Timer`]).
    #[serde(rename = "window_ms", with = "millis")]
    pub window: Duration,
    /// Close the window once it holds this many events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u64>,
    /// Entries kept in ranked breakdowns.
    pub top_n: usize,
    /// Time-based flush driver.
    pub mode: FlushMode,
    /// Policy for windows that close with no activity.
    pub empty_window: EmptyWindow,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            batch_size: None,
            top_n: DEFAULT_TOP_N,
            mode: FlushMode::Lazy,
            empty_window: EmptyWindow::Skip,
        }
    }
}

impl AggregatorConfig {
    /// Creates the default configuration: 5 minute lazy window, top 5.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the window length.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Closes the window early once it holds `size` events.
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Sets the top-N limit.
    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    /// Sets the flush driver.
    pub fn with_mode(mut self, mode: FlushMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the empty-window policy.
    pub fn with_empty_window(mut self, policy: EmptyWindow) -> Self {
        self.empty_window = policy;
        self
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        if self.batch_size == Some(0) {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.top_n == 0 {
            return Err(ConfigError::ZeroTopN);
        }
        Ok(())
    }
}

/// Serializes a [`Duration`] as whole milliseconds.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.window, Duration::from_secs(300));
        assert_eq!(config.batch_size, None);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.mode, FlushMode::Lazy);
        assert_eq!(config.empty_window, EmptyWindow::Skip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = AggregatorConfig::new()
            .with_window(Duration::from_secs(60))
            .with_batch_size(100)
            .with_top_n(3)
            .with_mode(FlushMode::Timer)
            .with_empty_window(EmptyWindow::Emit);

        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.batch_size, Some(100));
        assert_eq!(config.top_n, 3);
        assert_eq!(config.mode, FlushMode::Timer);
        assert_eq!(config.empty_window, EmptyWindow::Emit);
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let zero_window = AggregatorConfig::new().with_window(Duration::ZERO);
        assert_eq!(zero_window.validate(), Err(ConfigError::ZeroWindow));

        let zero_batch = AggregatorConfig::new().with_batch_size(0);
        assert_eq!(zero_batch.validate(), Err(ConfigError::ZeroBatchSize));

        let zero_top = AggregatorConfig::new().with_top_n(0);
        assert_eq!(zero_top.validate(), Err(ConfigError::ZeroTopN));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AggregatorConfig =
            serde_json::from_str(r#"{"window_ms": 1500, "empty_window": "emit"}"#).unwrap();
        assert_eq!(config.window, Duration::from_millis(1500));
        assert_eq!(config.empty_window, EmptyWindow::Emit);
        assert_eq!(config.top_n, DEFAULT_TOP_N);
        assert_eq!(config.mode, FlushMode::Lazy);
    }

    #[test]
    fn test_serialize_roundtrip_names() {
        let config = AggregatorConfig::new().with_mode(FlushMode::Timer);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""window_ms":300000"#));
        assert!(json.contains(r#""mode":"timer""#));
        assert!(!json.contains("batch_size"));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ConfigError::ZeroBatchSize.to_string(),
            "batch size must be greater than zero"
        );
    }
}
