//! SQS client wrapper implementing the queue port.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::config::Region;
use tracing::{debug, info};
use uuid::Uuid;

use jobhub_core::config::QueueConfig;
use jobhub_core::error::{AppError, ErrorKind};
use jobhub_core::result::AppResult;
use jobhub_core::traits::queue::{JobMessage, MessageQueue, QueueMessage, receive_limits};

/// Queue provider backed by Amazon SQS.
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Build an SQS client from configuration.
    ///
    /// Credentials come from the default AWS provider chain. A configured
    /// `endpoint` overrides the regional endpoint.
    pub async fn connect(config: &QueueConfig) -> AppResult<Self> {
        if config.queue_url.is_empty() {
            return Err(AppError::configuration(
                "queue.queue_url must be set for the sqs provider",
            ));
        }

        info!(
            queue_url = %config.queue_url,
            region = %config.region,
            endpoint = config.endpoint.as_deref().unwrap_or("default"),
            "Initializing SQS queue provider"
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_sqs::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            queue_url: config.queue_url.clone(),
        })
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    fn provider_type(&self) -> &str {
        "sqs"
    }

    async fn send(&self, job_id: Uuid) -> AppResult<()> {
        let body = JobMessage::new(job_id).encode()?;

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Queue, "Failed to send message", e))?;

        debug!(%job_id, "Sent job message");
        Ok(())
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> AppResult<Vec<QueueMessage>> {
        let (max, wait) = receive_limits(max_messages, wait_time);

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max as i32)
            .wait_time_seconds(wait.as_secs() as i32)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Queue, "Failed to receive messages", e)
            })?;

        Ok(output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| QueueMessage {
                message_id: m.message_id,
                body: m.body,
                receipt_handle: m.receipt_handle,
            })
            .collect())
    }

    async fn delete(&self, receipt_handle: &str) -> AppResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Queue, "Failed to delete message", e))?;
        Ok(())
    }
}
