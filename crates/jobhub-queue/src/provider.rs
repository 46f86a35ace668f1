//! Queue manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use jobhub_core::config::QueueConfig;
use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::traits::queue::{MessageQueue, QueueMessage};

/// Queue manager that wraps the configured queue provider.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct QueueManager {
    /// The inner queue provider.
    inner: Arc<dyn MessageQueue>,
}

impl QueueManager {
    /// Create a new queue manager from configuration.
    pub async fn new(config: &QueueConfig) -> AppResult<Self> {
        let inner: Arc<dyn MessageQueue> = match config.provider.as_str() {
            #[cfg(feature = "sqs")]
            "sqs" => {
                let queue = crate::sqs::SqsQueue::connect(config).await?;
                Arc::new(queue)
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory queue provider");
                Arc::new(crate::memory::MemoryQueue::new(Duration::from_secs(
                    config.visibility_timeout_seconds,
                )))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown queue provider: '{other}'. Supported: memory, sqs"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Get a shared handle to the inner provider.
    pub fn provider(&self) -> Arc<dyn MessageQueue> {
        Arc::clone(&self.inner)
    }
}

#[async_trait]
impl MessageQueue for QueueManager {
    fn provider_type(&self) -> &str {
        self.inner.provider_type()
    }

    async fn send(&self, job_id: Uuid) -> AppResult<()> {
        self.inner.send(job_id).await
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> AppResult<Vec<QueueMessage>> {
        self.inner.receive(max_messages, wait_time).await
    }

    async fn delete(&self, receipt_handle: &str) -> AppResult<()> {
        self.inner.delete(receipt_handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobhub_core::error::ErrorKind;

    #[tokio::test]
    async fn test_unknown_provider_is_configuration_error() {
        let config = QueueConfig {
            provider: "kafka".to_string(),
            ..QueueConfig::default()
        };
        let err = QueueManager::new(&config).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[cfg(feature = "sqs")]
    #[tokio::test]
    async fn test_sqs_requires_queue_url() {
        let err = QueueManager::new(&QueueConfig::default()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[cfg(feature = "memory")]
    #[tokio::test]
    async fn test_memory_provider_selected() {
        let config = QueueConfig {
            provider: "memory".to_string(),
            ..QueueConfig::default()
        };
        let manager = QueueManager::new(&config).await.unwrap();
        assert_eq!(manager.provider_type(), "memory");
    }
}
