//! Data processing job handler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use jobhub_core::traits::Clock;
use jobhub_entity::job::{Job, JobResult};

use super::types;
use crate::executor::{JobExecutionError, JobHandler};

/// Simulated processing time per payload byte.
pub const TIME_PER_BYTE: Duration = Duration::from_millis(10);

/// Processes the payload at a fixed rate per byte
#[derive(Debug)]
pub struct DataProcessingJobHandler {
    /// Time source
    clock: Arc<dyn Clock>,
}

impl DataProcessingJobHandler {
    /// Create a new data processing handler
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl JobHandler for DataProcessingJobHandler {
    fn job_type(&self) -> &str {
        types::DATA_PROCESSING
    }

    async fn execute(&self, job: &Job) -> Result<JobResult, JobExecutionError> {
        let processing_time = TIME_PER_BYTE * job.data.len() as u32;
        tokio::time::sleep(processing_time).await;

        Ok(JobResult {
            processed_at: self.clock.now(),
            input_count: job.data.len() as i64,
            message: format!("Data processed successfully in {processing_time:?}"),
        })
    }
}
