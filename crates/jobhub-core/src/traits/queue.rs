//! Message queue trait for pluggable queue backends.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::AppResult;

/// Most messages a single receive call may return.
pub const MAX_RECEIVE_BATCH: usize = 10;

/// Longest long-poll wait a single receive call may use.
pub const MAX_RECEIVE_WAIT: Duration = Duration::from_secs(20);

/// Clamp caller-supplied receive limits to what a provider accepts.
pub fn receive_limits(max_messages: usize, wait_time: Duration) -> (usize, Duration) {
    (
        max_messages.clamp(1, MAX_RECEIVE_BATCH),
        wait_time.min(MAX_RECEIVE_WAIT),
    )
}

/// The queue envelope. Carries only the job reference, never the payload;
/// the job store stays the single source of truth for job content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    /// Job identifier as text. Validated by the consumer, not here.
    pub job_id: String,
}

impl JobMessage {
    /// Build the envelope for a job.
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id: job_id.to_string(),
        }
    }

    /// Serialize to the JSON text placed on the queue.
    pub fn encode(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a message body.
    pub fn decode(body: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Parse the embedded identifier.
    pub fn parse_job_id(&self) -> AppResult<Uuid> {
        Ok(Uuid::parse_str(&self.job_id)?)
    }
}

/// A message delivered by [`MessageQueue::receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Provider-assigned message identifier.
    pub message_id: Option<String>,
    /// Raw message body.
    pub body: Option<String>,
    /// Token identifying this delivery; required to delete the message.
    pub receipt_handle: Option<String>,
}

/// Trait for at-least-once queue backends (SQS, in-memory).
///
/// A received message stays invisible to other consumers until its
/// visibility window lapses; it is redelivered unless deleted first.
#[async_trait]
pub trait MessageQueue: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider name.
    fn provider_type(&self) -> &str;

    /// Enqueue the envelope for `job_id`.
    async fn send(&self, job_id: Uuid) -> AppResult<()>;

    /// Long-poll for up to `max_messages`, waiting at most `wait_time` for
    /// the first one. An empty vector means the wait elapsed. Limits are
    /// clamped with [`receive_limits`].
    async fn receive(&self, max_messages: usize, wait_time: Duration)
    -> AppResult<Vec<QueueMessage>>;

    /// Remove a delivered message.
    async fn delete(&self, receipt_handle: &str) -> AppResult<()>;
}
