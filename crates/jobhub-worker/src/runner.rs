//! Worker runner: the queue consumer loop.
//!
//! Long-polls the queue, drives each referenced job through
//! `pending -> processing -> completed | failed`, and deletes the message
//! only once the terminal state is stored. Anything that goes wrong before
//! that leaves the message in the queue for redelivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{self, Instrument};

use jobhub_core::config::WorkerConfig;
use jobhub_core::traits::{Clock, JobMessage, MessageQueue, QueueMessage};
use jobhub_database::JobStore;
use jobhub_entity::job::JobStatus;

use crate::executor::JobExecutor;

/// Counters maintained by the consumer loop
#[derive(Debug, Default)]
pub struct WorkerStats {
    received: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    receive_errors: AtomicU64,
    delete_errors: AtomicU64,
}

/// Point-in-time copy of [`WorkerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Messages handed to the loop
    pub received: u64,
    /// Jobs stored as completed
    pub completed: u64,
    /// Jobs stored as failed
    pub failed: u64,
    /// Messages left for redelivery
    pub skipped: u64,
    /// Failed receive calls
    pub receive_errors: u64,
    /// Failed deletes after a stored outcome
    pub delete_errors: u64,
}

impl WorkerStats {
    /// Read all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            delete_errors: self.delete_errors.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// What happened to a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The job reached this terminal status and it was stored
    Processed(JobStatus),
    /// Nothing terminal was stored; the message stays in the queue
    Skipped,
}

/// Main worker runner that consumes the queue and executes jobs
#[derive(Debug)]
pub struct WorkerRunner {
    /// Message queue
    queue: Arc<dyn MessageQueue>,
    /// Job store
    store: Arc<dyn JobStore>,
    /// Job executor for dispatching
    executor: Arc<JobExecutor>,
    /// Time source for `updated_at`
    clock: Arc<dyn Clock>,
    /// Worker configuration
    config: WorkerConfig,
    /// Loop counters
    stats: Arc<WorkerStats>,
}

/// Resolve once shutdown is requested. A dropped sender counts as shutdown.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|stop| *stop).await;
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn JobStore>,
        executor: Arc<JobExecutor>,
        clock: Arc<dyn Clock>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            store,
            executor,
            clock,
            config,
            stats: Arc::new(WorkerStats::default()),
        }
    }

    /// Shared handle to the loop counters
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Start the worker runner; runs until the cancel signal is received.
    ///
    /// A pending receive or backoff sleep is abandoned on shutdown. A
    /// message already being processed is finished first; the rest of its
    /// batch is left for redelivery.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            "Worker started: provider={}, max_messages={}, wait_time={}s",
            self.queue.provider_type(),
            self.config.max_messages,
            self.config.wait_time_seconds
        );

        'poll: loop {
            if *cancel.borrow() {
                break;
            }

            let received = tokio::select! {
                _ = cancelled(&mut cancel) => break,
                received = self.queue.receive(self.config.max_messages, self.config.wait_time()) => received,
            };

            match received {
                Ok(messages) => {
                    tracing::trace!("Received {} messages", messages.len());
                    for message in &messages {
                        if *cancel.borrow() {
                            break 'poll;
                        }
                        self.process_message(message).await;
                    }
                }
                Err(e) => {
                    WorkerStats::bump(&self.stats.receive_errors);
                    tracing::error!(
                        "Failed to receive messages: {}. Retrying in {}s",
                        e,
                        self.config.error_backoff_seconds
                    );
                    tokio::select! {
                        _ = cancelled(&mut cancel) => break,
                        _ = tokio::time::sleep(self.config.error_backoff()) => {}
                    }
                }
            }
        }

        tracing::info!("Worker shut down: {:?}", self.stats.snapshot());
    }

    /// Handle one delivered message.
    pub async fn process_message(&self, message: &QueueMessage) -> MessageOutcome {
        WorkerStats::bump(&self.stats.received);

        let span = tracing::info_span!(
            "message",
            message_id = message.message_id.as_deref().unwrap_or("-"),
            job_id = tracing::field::Empty,
        );

        let outcome = self.handle(message).instrument(span).await;
        match outcome {
            MessageOutcome::Processed(JobStatus::Failed) => {
                WorkerStats::bump(&self.stats.failed)
            }
            MessageOutcome::Processed(_) => WorkerStats::bump(&self.stats.completed),
            MessageOutcome::Skipped => WorkerStats::bump(&self.stats.skipped),
        }
        outcome
    }

    async fn handle(&self, message: &QueueMessage) -> MessageOutcome {
        let Some(body) = message.body.as_deref() else {
            tracing::warn!("Message has no body, leaving it in the queue");
            return MessageOutcome::Skipped;
        };

        let job_id = match JobMessage::decode(body).and_then(|m| m.parse_job_id()) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Malformed job message: {}", e);
                return MessageOutcome::Skipped;
            }
        };
        tracing::Span::current().record("job_id", tracing::field::display(job_id));

        let mut job = match self.store.find_by_id(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!("Job {} not found", job_id);
                return MessageOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!("Failed to load job {}: {}", job_id, e);
                return MessageOutcome::Skipped;
            }
        };

        if !job.status.can_transition_to(JobStatus::Processing) {
            tracing::warn!(
                "Job {} redelivered in status '{}', processing it again",
                job.id,
                job.status
            );
        }

        job.mark_processing(self.clock.now());
        if let Err(e) = self.store.update(&job).await {
            tracing::error!("Failed to mark job {} as processing: {}", job.id, e);
            return MessageOutcome::Skipped;
        }

        tracing::info!("Processing job: id={}, type='{}'", job.id, job.job_type);

        match self.executor.execute(&job).await {
            Ok(result) => job.mark_completed(result, self.clock.now()),
            Err(e) => {
                tracing::warn!("Job {} failed: {}", job.id, e);
                job.mark_failed(e.to_string(), self.clock.now());
            }
        }

        if let Err(e) = self.store.update(&job).await {
            tracing::error!("Failed to store outcome of job {}: {}", job.id, e);
            return MessageOutcome::Skipped;
        }

        if let Some(receipt) = message.receipt_handle.as_deref() {
            if let Err(e) = self.queue.delete(receipt).await {
                WorkerStats::bump(&self.stats.delete_errors);
                tracing::error!("Failed to delete message for job {}: {}", job.id, e);
            }
        }

        tracing::info!("Job processed: id={}, status={}", job.id, job.status);
        MessageOutcome::Processed(job.status)
    }
}
