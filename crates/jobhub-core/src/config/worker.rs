//! Queue consumer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Consumer loop configuration.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the consumer loop runs in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Long-poll wait per receive call, in seconds.
    #[serde(default = "default_wait_time")]
    #[validate(range(max = 20))]
    pub wait_time_seconds: u64,
    /// Maximum messages returned by one receive call.
    #[serde(default = "default_max_messages")]
    #[validate(range(min = 1, max = 10))]
    pub max_messages: usize,
    /// Sleep after a failed receive call, in seconds.
    #[serde(default = "default_error_backoff")]
    #[validate(range(min = 1))]
    pub error_backoff_seconds: u64,
}

impl WorkerConfig {
    /// Long-poll wait as a [`Duration`].
    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_seconds)
    }

    /// Receive error backoff as a [`Duration`].
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            wait_time_seconds: default_wait_time(),
            max_messages: default_max_messages(),
            error_backoff_seconds: default_error_backoff(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_wait_time() -> u64 {
    20
}

fn default_max_messages() -> usize {
    10
}

fn default_error_backoff() -> u64 {
    5
}
