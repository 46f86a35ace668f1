//! Job persistence port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_entity::job::{Job, JobStatus};

/// Row limit applied when a caller passes a non-positive limit.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Normalize a caller-supplied list limit.
pub fn effective_limit(limit: i64) -> i64 {
    if limit > 0 { limit } else { DEFAULT_LIST_LIMIT }
}

/// Durable store of job records.
///
/// The store performs no state-machine checks: `update` overwrites whatever
/// status the caller wrote.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a new job.
    async fn create(&self, job: &Job) -> AppResult<()>;

    /// Find a job by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>>;

    /// Overwrite an existing job. Fails with `NotFound` if it is gone.
    async fn update(&self, job: &Job) -> AppResult<()>;

    /// List jobs newest first, optionally filtered by status.
    async fn list(&self, status: Option<JobStatus>, limit: i64) -> AppResult<Vec<Job>>;

    /// Count jobs, optionally filtered by status.
    async fn count(&self, status: Option<JobStatus>) -> AppResult<i64>;

    /// Count jobs with `from <= created_at < to`.
    async fn count_created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>)
    -> AppResult<i64>;

    /// Count jobs in `status` with `from <= updated_at < to`.
    async fn count_updated_between(
        &self,
        status: JobStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<i64>;

    /// Delete completed jobs with `updated_at < cutoff`. Returns rows removed.
    async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// Look up a job by its textual ID.
    ///
    /// Returns a `Validation` error for a malformed ID and `NotFound` for a
    /// missing job.
    async fn get(&self, id: &str) -> AppResult<Job> {
        let uuid = Uuid::parse_str(id)?;
        self.find_by_id(uuid)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Job {uuid} not found")))
    }

    /// List pending jobs, newest first.
    async fn list_pending(&self, limit: i64) -> AppResult<Vec<Job>> {
        self.list(Some(JobStatus::Pending), limit).await
    }
}
