//! Batch import job handler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing;

use jobhub_core::traits::Clock;
use jobhub_entity::job::{Job, JobResult};

use super::types;
use crate::executor::{JobExecutionError, JobHandler};

/// Payload bytes that make up one simulated record.
pub const BYTES_PER_RECORD: usize = 10;

/// Simulated import time per record.
pub const TIME_PER_RECORD: Duration = Duration::from_millis(100);

/// Imports one record per ten bytes of payload
#[derive(Debug)]
pub struct BatchImportJobHandler {
    /// Time source
    clock: Arc<dyn Clock>,
}

impl BatchImportJobHandler {
    /// Create a new batch import handler
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl JobHandler for BatchImportJobHandler {
    fn job_type(&self) -> &str {
        types::BATCH_IMPORT
    }

    async fn execute(&self, job: &Job) -> Result<JobResult, JobExecutionError> {
        let record_count = job.data.len() / BYTES_PER_RECORD;
        tracing::debug!("Importing {} records for job {}", record_count, job.id);

        tokio::time::sleep(TIME_PER_RECORD * record_count as u32).await;

        Ok(JobResult {
            processed_at: self.clock.now(),
            input_count: record_count as i64,
            message: format!("Batch import completed: {record_count} records processed"),
        })
    }
}
