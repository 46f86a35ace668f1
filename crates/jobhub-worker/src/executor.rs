//! Job executor that dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing;

use jobhub_core::error::AppError;
use jobhub_core::traits::Clock;
use jobhub_database::JobStore;
use jobhub_entity::job::{Job, JobResult};

use crate::jobs::cleanup::CleanupJobHandler;
use crate::jobs::generic::GenericJobHandler;
use crate::jobs::import::BatchImportJobHandler;
use crate::jobs::processing::DataProcessingJobHandler;
use crate::jobs::report::{AggregationJobHandler, HealthReportJobHandler};

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes
    fn job_type(&self) -> &str;

    /// Execute the job. Handlers never change the job's status.
    async fn execute(&self, job: &Job) -> Result<JobResult, JobExecutionError>;
}

/// Error from job execution. Its display text is recorded on the failed job.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The job cannot succeed as submitted
    #[error("{0}")]
    Permanent(String),

    /// The job store failed while the handler was running
    #[error("Job store error: {0}")]
    Store(#[from] AppError),
}

/// Dispatches jobs to the appropriate handler based on job_type
#[derive(Debug)]
pub struct JobExecutor {
    /// Registered job handlers by type
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    /// Handler for unregistered types
    fallback: Arc<dyn JobHandler>,
}

impl JobExecutor {
    /// Create an executor with no registered types
    pub fn new(fallback: Arc<dyn JobHandler>) -> Self {
        Self {
            handlers: HashMap::new(),
            fallback,
        }
    }

    /// Create an executor with every built-in handler registered
    pub fn with_default_handlers(store: Arc<dyn JobStore>, clock: Arc<dyn Clock>) -> Self {
        let mut executor = Self::new(Arc::new(GenericJobHandler::new(Arc::clone(&clock))));
        executor.register(Arc::new(CleanupJobHandler::new(
            Arc::clone(&store),
            Arc::clone(&clock),
        )));
        executor.register(Arc::new(HealthReportJobHandler::new(
            Arc::clone(&store),
            Arc::clone(&clock),
        )));
        executor.register(Arc::new(AggregationJobHandler::new(
            Arc::clone(&store),
            Arc::clone(&clock),
        )));
        executor.register(Arc::new(BatchImportJobHandler::new(Arc::clone(&clock))));
        executor.register(Arc::new(DataProcessingJobHandler::new(clock)));
        executor
    }

    /// Register a job handler, replacing any earlier one for the same type
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!("Registered job handler for type '{}'", job_type);
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to the correct handler
    pub async fn execute(&self, job: &Job) -> Result<JobResult, JobExecutionError> {
        let handler = match self.handlers.get(&job.job_type) {
            Some(handler) => handler,
            None => {
                tracing::debug!(
                    "No handler registered for type '{}', using default",
                    job.job_type
                );
                &self.fallback
            }
        };

        tracing::info!("Executing job: id={}, type='{}'", job.id, job.job_type);
        handler.execute(job).await
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Get the list of registered job types, sorted
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use jobhub_core::traits::TokioClock;
    use jobhub_database::MemoryJobStore;

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl JobHandler for Failing {
        fn job_type(&self) -> &str {
            "always-fails"
        }

        async fn execute(&self, _job: &Job) -> Result<JobResult, JobExecutionError> {
            Err(JobExecutionError::Permanent("bad input".to_string()))
        }
    }

    fn executor() -> JobExecutor {
        let clock = Arc::new(TokioClock::starting_at(
            Utc.with_ymd_and_hms(2026, 4, 2, 8, 0, 0).unwrap(),
        ));
        JobExecutor::with_default_handlers(Arc::new(MemoryJobStore::new()), clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_registry() {
        let executor = executor();
        assert_eq!(
            executor.registered_types(),
            vec![
                "batch-import",
                "cleanup",
                "data-aggregation",
                "data-processing",
                "health-report"
            ]
        );
        assert!(!executor.has_handler("email"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_type_uses_fallback() {
        let executor = executor();
        let job = Job::new("email", "hello", Utc::now());
        let result = executor.execute(&job).await.unwrap();
        assert_eq!(result.input_count, 5);
        assert!(result.message.starts_with("Job of type 'email' processed in"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_error_text() {
        let mut executor = executor();
        executor.register(Arc::new(Failing));
        let job = Job::new("always-fails", "x", Utc::now());
        let err = executor.execute(&job).await.unwrap_err();
        assert_eq!(err.to_string(), "bad input");
    }
}
