//! Job submission: validate, persist as pending, enqueue.

use std::sync::Arc;

use validator::Validate;

use jobhub_core::result::AppResult;
use jobhub_core::traits::{Clock, MessageQueue};
use jobhub_database::JobStore;
use jobhub_entity::job::{Job, NewJob};

/// Creates jobs and hands them to the queue.
///
/// The job record is written before its message is sent, so a consumer
/// never receives an ID the store does not know. If the send fails the
/// error is returned and the pending record stays behind.
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    /// Job store
    store: Arc<dyn JobStore>,
    /// Message queue
    queue: Arc<dyn MessageQueue>,
    /// Time source for `created_at`
    clock: Arc<dyn Clock>,
}

impl JobSubmitter {
    /// Create a new submitter
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn MessageQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            queue,
            clock,
        }
    }

    /// Validate and submit a job, returning the stored record.
    pub async fn submit(&self, new_job: NewJob) -> AppResult<Job> {
        new_job.validate()?;

        let job = new_job.into_job(self.clock.now());
        self.store.create(&job).await?;

        if let Err(e) = self.queue.send(job.id).await {
            tracing::error!("Failed to enqueue job {}: {}", job.id, e);
            return Err(e);
        }

        tracing::info!("Submitted job: id={}, type='{}'", job.id, job.job_type);
        Ok(job)
    }
}
