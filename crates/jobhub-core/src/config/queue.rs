//! Message queue configuration.

use serde::{Deserialize, Serialize};

/// Queue provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Provider: `"sqs"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Full SQS queue URL.
    #[serde(default)]
    pub queue_url: String,
    /// Optional endpoint override (e.g. LocalStack).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Visibility timeout applied by the in-memory provider, in seconds.
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            queue_url: String::new(),
            endpoint: None,
            region: default_region(),
            visibility_timeout_seconds: default_visibility_timeout(),
        }
    }
}

fn default_provider() -> String {
    "sqs".to_string()
}

fn default_region() -> String {
    "us-east-2".to_string()
}

fn default_visibility_timeout() -> u64 {
    30
}
