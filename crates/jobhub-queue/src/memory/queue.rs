//! In-memory queue with SQS-like delivery semantics.
//!
//! A received message becomes invisible for the visibility timeout and is
//! redelivered unless deleted first. Receives long-poll until a message
//! arrives, an in-flight message becomes visible again, or the wait
//! elapses. All timing uses `tokio::time`, so paused-time tests work.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::traits::queue::{JobMessage, MessageQueue, QueueMessage, receive_limits};

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: Option<String>,
    receive_count: u32,
}

#[derive(Debug)]
struct InFlight {
    message: StoredMessage,
    visible_at: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    visible: VecDeque<StoredMessage>,
    in_flight: HashMap<String, InFlight>,
}

impl QueueState {
    /// Return expired in-flight messages to the visible queue, oldest
    /// message ID order preserved by `visible_at`.
    fn requeue_expired(&mut self, now: Instant) {
        let mut expired: Vec<(String, Instant)> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.visible_at <= now)
            .map(|(receipt, f)| (receipt.clone(), f.visible_at))
            .collect();
        expired.sort_by_key(|(_, visible_at)| *visible_at);

        for (receipt, _) in expired {
            if let Some(flight) = self.in_flight.remove(&receipt) {
                trace!(message_id = %flight.message.message_id, "Message visible again");
                self.visible.push_back(flight.message);
            }
        }
    }

    fn next_visibility(&self) -> Option<Instant> {
        self.in_flight.values().map(|f| f.visible_at).min()
    }
}

/// In-memory queue provider.
#[derive(Debug)]
pub struct MemoryQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    visibility_timeout: Duration,
    failing_receives: AtomicUsize,
    fail_deletes: AtomicBool,
    receive_calls: AtomicUsize,
}

impl MemoryQueue {
    /// Create an empty queue.
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            visibility_timeout,
            failing_receives: AtomicUsize::new(0),
            fail_deletes: AtomicBool::new(false),
            receive_calls: AtomicUsize::new(0),
        }
    }

    /// Enqueue an arbitrary body (or none), bypassing the envelope encoder.
    pub async fn push_raw(&self, body: Option<String>) -> String {
        let message_id = Uuid::new_v4().to_string();
        self.state.lock().await.visible.push_back(StoredMessage {
            message_id: message_id.clone(),
            body,
            receive_count: 0,
        });
        self.notify.notify_one();
        message_id
    }

    /// Fail the next `count` receive calls.
    pub fn fail_next_receives(&self, count: usize) {
        self.failing_receives.store(count, Ordering::SeqCst);
    }

    /// Make every delete fail until reset.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of receive calls made so far, including failed ones.
    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    /// Messages currently visible.
    pub async fn visible_len(&self) -> usize {
        self.state.lock().await.visible.len()
    }

    /// Messages delivered but neither deleted nor visible again.
    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    /// Visible plus in-flight messages.
    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.visible.len() + state.in_flight.len()
    }

    /// Whether no message is stored at all.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_receives
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn send(&self, job_id: Uuid) -> AppResult<()> {
        let body = JobMessage::new(job_id).encode()?;
        let message_id = self.push_raw(Some(body)).await;
        debug!(%job_id, %message_id, "Queued job message");
        Ok(())
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> AppResult<Vec<QueueMessage>> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_injected_failure() {
            return Err(AppError::queue("Injected receive failure"));
        }

        let (max_messages, wait_time) = receive_limits(max_messages, wait_time);
        let deadline = Instant::now() + wait_time;
        loop {
            let wake_at = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                state.requeue_expired(now);

                let take = max_messages.min(state.visible.len());
                if take > 0 {
                    let mut batch = Vec::with_capacity(take);
                    for mut message in state.visible.drain(..take).collect::<Vec<_>>() {
                        message.receive_count += 1;
                        let receipt = Uuid::new_v4().to_string();
                        batch.push(QueueMessage {
                            message_id: Some(message.message_id.clone()),
                            body: message.body.clone(),
                            receipt_handle: Some(receipt.clone()),
                        });
                        state.in_flight.insert(
                            receipt,
                            InFlight {
                                message,
                                visible_at: now + self.visibility_timeout,
                            },
                        );
                    }
                    return Ok(batch);
                }

                if now >= deadline {
                    return Ok(Vec::new());
                }

                state
                    .next_visibility()
                    .map_or(deadline, |visible_at| visible_at.min(deadline))
            };

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn delete(&self, receipt_handle: &str) -> AppResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::queue("Injected delete failure"));
        }

        let removed = self.state.lock().await.in_flight.remove(receipt_handle);
        match removed {
            Some(flight) => {
                trace!(
                    message_id = %flight.message.message_id,
                    receive_count = flight.message.receive_count,
                    "Deleted message"
                );
                Ok(())
            }
            None => Err(AppError::queue(format!(
                "Receipt handle '{receipt_handle}' is invalid or expired"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> MemoryQueue {
        MemoryQueue::new(Duration::from_secs(30))
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_receive_delete() {
        let q = queue();
        let id = Uuid::new_v4();
        q.send(id).await.unwrap();

        let batch = q.receive(10, Duration::from_secs(20)).await.unwrap();
        assert_eq!(batch.len(), 1);
        let envelope = JobMessage::decode(batch[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(envelope.parse_job_id().unwrap(), id);

        q.delete(batch[0].receipt_handle.as_deref().unwrap())
            .await
            .unwrap();
        assert!(q.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_respects_batch_size_and_order() {
        let q = queue();
        let ids: Vec<Uuid> = (0..12).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            q.send(*id).await.unwrap();
        }

        let batch = q.receive(10, Duration::from_secs(20)).await.unwrap();
        assert_eq!(batch.len(), 10);
        let received: Vec<Uuid> = batch
            .iter()
            .map(|m| {
                JobMessage::decode(m.body.as_deref().unwrap())
                    .unwrap()
                    .parse_job_id()
                    .unwrap()
            })
            .collect();
        assert_eq!(received, ids[..10]);
        assert_eq!(q.visible_len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_clamps_batch_size() {
        let q = queue();
        for _ in 0..15 {
            q.send(Uuid::new_v4()).await.unwrap();
        }

        assert_eq!(q.receive(0, Duration::from_secs(20)).await.unwrap().len(), 1);
        assert_eq!(q.receive(50, Duration::from_secs(20)).await.unwrap().len(), 10);
        assert_eq!(q.visible_len().await, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_poll_capped_at_twenty_seconds() {
        let q = queue();
        let start = Instant::now();
        let batch = q.receive(10, Duration::from_secs(90)).await.unwrap();
        assert!(batch.is_empty());
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_receive_waits_full_poll() {
        let q = queue();
        let start = Instant::now();
        let batch = q.receive(10, Duration::from_secs(20)).await.unwrap();
        assert!(batch.is_empty());
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_poll_wakes_on_send() {
        let q = std::sync::Arc::new(queue());
        let sender = std::sync::Arc::clone(&q);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            sender.send(Uuid::new_v4()).await.unwrap();
        });

        let start = Instant::now();
        let batch = q.receive(10, Duration::from_secs(20)).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_undeleted_message_is_redelivered() {
        let q = queue();
        q.send(Uuid::new_v4()).await.unwrap();

        let first = q.receive(10, Duration::from_secs(20)).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(q.in_flight_len().await, 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        let second = q.receive(10, Duration::from_secs(20)).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].message_id, second[0].message_id);
        assert_ne!(first[0].receipt_handle, second[0].receipt_handle);

        // The stale receipt no longer deletes anything.
        assert!(
            q.delete(first[0].receipt_handle.as_deref().unwrap())
                .await
                .is_err()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_receive_failures() {
        let q = queue();
        q.fail_next_receives(2);
        assert!(q.receive(10, Duration::from_secs(1)).await.is_err());
        assert!(q.receive(10, Duration::from_secs(1)).await.is_err());
        assert!(q.receive(10, Duration::from_secs(1)).await.is_ok());
        assert_eq!(q.receive_calls(), 3);
    }
}
