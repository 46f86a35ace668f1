//! Retention cleanup of completed jobs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tracing;

use jobhub_core::traits::Clock;
use jobhub_database::JobStore;
use jobhub_entity::job::{Job, JobResult};

use super::types;
use crate::executor::{JobExecutionError, JobHandler};

/// Completed jobs are kept this many days after their last update.
pub const RETENTION_DAYS: i64 = 7;

/// Deletes completed jobs whose last update is older than the retention window
#[derive(Debug)]
pub struct CleanupJobHandler {
    /// Job store
    store: Arc<dyn JobStore>,
    /// Time source
    clock: Arc<dyn Clock>,
}

impl CleanupJobHandler {
    /// Create a new cleanup job handler
    pub fn new(store: Arc<dyn JobStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl JobHandler for CleanupJobHandler {
    fn job_type(&self) -> &str {
        types::CLEANUP
    }

    async fn execute(&self, _job: &Job) -> Result<JobResult, JobExecutionError> {
        let cutoff = self.clock.now() - Duration::days(RETENTION_DAYS);
        tracing::info!("Running job cleanup, cutoff={}", cutoff);

        let deleted = self.store.delete_completed_before(cutoff).await?;

        tracing::info!("Cleaned up {} old completed jobs", deleted);
        Ok(JobResult {
            processed_at: self.clock.now(),
            input_count: deleted as i64,
            message: format!("Cleaned up {deleted} old completed jobs"),
        })
    }
}
