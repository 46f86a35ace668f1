//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field has a default so an empty file is valid.

pub mod database;
pub mod logging;
pub mod queue;
pub mod scheduler;
pub mod worker;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::queue::QueueConfig;
pub use self::scheduler::SchedulerConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged configuration
/// (base file + environment overlay + `JOBHUB__*` variables).
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Message queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Consumer loop settings.
    #[serde(default)]
    #[validate(nested)]
    pub worker: WorkerConfig,
    /// Scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// `base` is a file path without extension (e.g. `config/default`). The
    /// overlay `config/{env}` is merged on top, then environment variables
    /// prefixed with `JOBHUB__` (e.g. `JOBHUB__QUEUE__QUEUE_URL`).
    ///
    /// The merged result is validated; out-of-range worker limits are a
    /// validation error.
    pub fn load(base: &str, env: &str) -> Result<Self, AppError> {
        let merged = Self::builder(base, env)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;
        Self::from_config(merged)
    }

    fn builder(base: &str, env: &str) -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("JOBHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
    }

    fn from_config(merged: config::Config) -> Result<Self, AppError> {
        let config: Self = merged
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
