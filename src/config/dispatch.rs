//! Dispatcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Default delay before an idle worker re-checks the queue.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
/// Default time a worker spends on one order.
pub const DEFAULT_PROCESSING_DURATION_MS: u64 = 10_000;
/// Default capacity of the in-memory event log.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 1_024;

/// Dispatcher timing and buffering. Fixed for the lifetime of a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Delay before an idle worker retries a dispatch attempt.
    pub poll_interval_ms: u64,
    /// Delay between dispatch and natural completion of an order.
    pub processing_duration_ms: u64,
    /// Capacity of event logs built from this configuration.
    pub event_log_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            processing_duration_ms: DEFAULT_PROCESSING_DURATION_MS,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
        }
    }
}

impl DispatchConfig {
    /// Configuration with the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_ms(interval);
        self
    }

    /// Set the processing duration.
    #[must_use]
    pub fn with_processing_duration(mut self, duration: Duration) -> Self {
        self.processing_duration_ms = duration_ms(duration);
        self
    }

    /// Set the event log capacity.
    #[must_use]
    pub fn with_event_log_capacity(mut self, capacity: usize) -> Self {
        self.event_log_capacity = capacity;
        self
    }

    /// Poll interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Processing duration as a `Duration`.
    #[must_use]
    pub const fn processing_duration(&self) -> Duration {
        Duration::from_millis(self.processing_duration_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Describes the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".into());
        }
        if self.processing_duration_ms == 0 {
            return Err("processing_duration_ms must be greater than 0".into());
        }
        if self.event_log_capacity == 0 {
            return Err("event_log_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their defaults.
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the environment, reading a `.env` file first
    /// if one exists. Recognized variables: `DISPATCH_POLL_INTERVAL_MS`,
    /// `DISPATCH_PROCESSING_DURATION_MS`, `DISPATCH_EVENT_LOG_CAPACITY`.
    ///
    /// # Errors
    ///
    /// A variable is set but not a number, or the result fails validation.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, starting from the
    /// defaults.
    ///
    /// # Errors
    ///
    /// A value is not a number, or the result fails validation.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup("DISPATCH_POLL_INTERVAL_MS") {
            cfg.poll_interval_ms = parse_var("DISPATCH_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("DISPATCH_PROCESSING_DURATION_MS") {
            cfg.processing_duration_ms = parse_var("DISPATCH_PROCESSING_DURATION_MS", &v)?;
        }
        if let Some(v) = lookup("DISPATCH_EVENT_LOG_CAPACITY") {
            cfg.event_log_capacity = parse_var("DISPATCH_EVENT_LOG_CAPACITY", &v)?;
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

fn parse_var<T>(key: &str, value: &str) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::Error::new(e).context(format!("{key}={value:?} is not a valid number")))
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
