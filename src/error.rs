//! # Dispatcher Error Types
//!
//! Structured error handling for the dispatcher using thiserror.
//!
//! Nothing here is returned by `pause`, `resume` or `wait` in normal operation;
//! the variants cover running outside a tokio runtime, bounded waits and
//! configuration loading.

use std::time::Duration;
use thiserror::Error;

/// Dispatcher error types
#[derive(Error, Debug)]
pub enum DispatcherError {
    #[error("No tokio runtime available to dispatch event '{event}'")]
    NoRuntime { event: String },

    #[error("Timed out waiting for event '{event}' after {timeout_ms}ms")]
    WaitTimedOut { event: String, timeout_ms: u64 },

    #[error("Timed out waiting for all events after {timeout_ms}ms")]
    WaitAllTimedOut { timeout_ms: u64 },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),
}

impl DispatcherError {
    /// Create a missing-runtime error for a dispatch of `event`
    pub fn no_runtime(event: impl Into<String>) -> Self {
        Self::NoRuntime {
            event: event.into(),
        }
    }

    /// Create a wait timeout error
    pub fn wait_timed_out(event: impl Into<String>, timeout: Duration) -> Self {
        Self::WaitTimedOut {
            event: event.into(),
            timeout_ms: millis(timeout),
        }
    }

    /// Create a timeout error for a wait across every event
    pub fn wait_all_timed_out(timeout: Duration) -> Self {
        Self::WaitAllTimedOut {
            timeout_ms: millis(timeout),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the error came from a bounded wait elapsing
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WaitTimedOut { .. } | Self::WaitAllTimedOut { .. })
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Result type for dispatcher operations
pub type DispatcherResult<T> = Result<T, DispatcherError>;
