//! Fallback handler for job types without a dedicated handler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use jobhub_core::traits::Clock;
use jobhub_entity::job::{Job, JobResult};

use crate::executor::{JobExecutionError, JobHandler};

/// Fixed processing time for unrecognized job types.
pub const GENERIC_PROCESSING_TIME: Duration = Duration::from_secs(1);

/// Default handler. Waits a fixed second regardless of payload.
#[derive(Debug)]
pub struct GenericJobHandler {
    clock: Arc<dyn Clock>,
}

impl GenericJobHandler {
    /// Create the fallback handler
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl JobHandler for GenericJobHandler {
    fn job_type(&self) -> &str {
        "*"
    }

    async fn execute(&self, job: &Job) -> Result<JobResult, JobExecutionError> {
        let started = Instant::now();
        tokio::time::sleep(GENERIC_PROCESSING_TIME).await;

        Ok(JobResult {
            processed_at: self.clock.now(),
            input_count: job.data.len() as i64,
            message: format!(
                "Job of type '{}' processed in {:?}",
                job.job_type,
                started.elapsed()
            ),
        })
    }
}
