//! Configuration Loader
//!
//! Layers an optional configuration file and `DISPATCHER__*` environment
//! variables over [`DispatcherConfig`] defaults, then validates the result.

use ::config::{Config, Environment, File};
use std::path::Path;
use tracing::debug;

use super::DispatcherConfig;
use crate::error::DispatcherResult;

/// Prefix for environment overrides, e.g. `DISPATCHER__START_PAUSED=true`
pub const ENV_PREFIX: &str = "DISPATCHER";

/// Loads [`DispatcherConfig`] from file and environment sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from an optional file plus environment overrides
    ///
    /// The file format is inferred from its extension. A path that is given but
    /// does not exist is an error.
    pub fn load(path: Option<impl AsRef<Path>>) -> DispatcherResult<DispatcherConfig> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            let path: &Path = path.as_ref();
            debug!(path = %path.display(), "Loading dispatcher configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Self::environment());

        let config: DispatcherConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            name = %config.name,
            start_paused = config.start_paused,
            slow_wait_warning_ms = config.slow_wait_warning_ms,
            "Dispatcher configuration loaded"
        );

        Ok(config)
    }

    /// Load configuration from environment overrides only
    pub fn from_env() -> DispatcherResult<DispatcherConfig> {
        Self::load(None::<&Path>)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }
}
