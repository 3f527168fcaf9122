//! # Dispatcher Configuration
//!
//! Configuration for a [`Dispatcher`](crate::events::Dispatcher). Values come
//! from defaults, an optional YAML/TOML/JSON file, and `DISPATCHER__*`
//! environment variables, layered in that order by [`ConfigLoader`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use event_dispatcher::{ConfigLoader, Dispatcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load(Some("config/dispatcher.yaml"))?;
//! let dispatcher = Dispatcher::with_config(config);
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DispatcherError, DispatcherResult};

pub use loader::ConfigLoader;

/// Runtime configuration for a dispatcher instance
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Label attached to every log line emitted by the dispatcher
    pub name: String,

    /// Construct the dispatcher in the paused state
    pub start_paused: bool,

    /// A waiter blocked on a single completion gate for longer than this logs a
    /// warning and keeps waiting. `0` disables the warning.
    pub slow_wait_warning_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "dispatcher".to_string(),
            start_paused: false,
            slow_wait_warning_ms: 30_000,
        }
    }
}

impl DispatcherConfig {
    /// Validate configuration values
    pub fn validate(&self) -> DispatcherResult<()> {
        if self.name.trim().is_empty() {
            return Err(DispatcherError::configuration("name must not be empty"));
        }
        Ok(())
    }

    /// Slow-wait warning threshold, `None` when disabled
    pub fn slow_wait_warning(&self) -> Option<Duration> {
        (self.slow_wait_warning_ms > 0).then(|| Duration::from_millis(self.slow_wait_warning_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DispatcherConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.start_paused);
        assert_eq!(
            config.slow_wait_warning(),
            Some(Duration::from_millis(30_000))
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let config = DispatcherConfig {
            name: "   ".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, DispatcherError::Configuration { .. }));
    }

    #[test]
    fn test_zero_threshold_disables_warning() {
        let config = DispatcherConfig {
            slow_wait_warning_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.slow_wait_warning(), None);
    }
}
