//! In-memory job store using dashmap.
//!
//! Test double for the job store. Supports failure injection so callers
//! can exercise store-outage paths, and records the status sequence
//! written for every job.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_entity::job::{Job, JobStatus};

use crate::store::{JobStore, effective_limit};

/// In-memory job store.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: DashMap<Uuid, Job>,
    history: DashMap<Uuid, Vec<JobStatus>>,
    fail_reads: AtomicBool,
    failing_writes: Mutex<Vec<JobStatus>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job as-is, bypassing failure injection and history.
    pub fn seed(&self, job: Job) {
        self.jobs.insert(job.id, job);
    }

    /// Snapshot a job without going through the port.
    pub fn snapshot(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|entry| entry.value().clone())
    }

    /// Statuses written through `create`/`update` for a job, in order.
    pub fn history(&self, id: Uuid) -> Vec<JobStatus> {
        self.history
            .get(&id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Number of stored jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Make every lookup fail until reset.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `update` fail whenever it would write `status`.
    pub fn fail_updates_to(&self, status: JobStatus) {
        if let Ok(mut failing) = self.failing_writes.lock() {
            failing.push(status);
        }
    }

    /// Clear all injected failures.
    pub fn clear_failures(&self) {
        self.fail_reads.store(false, Ordering::SeqCst);
        if let Ok(mut failing) = self.failing_writes.lock() {
            failing.clear();
        }
    }

    fn check_read(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::service_unavailable("Job store unavailable"));
        }
        Ok(())
    }

    fn check_write(&self, status: JobStatus) -> AppResult<()> {
        let failing = self
            .failing_writes
            .lock()
            .map(|failing| failing.contains(&status))
            .unwrap_or(false);
        if failing {
            return Err(AppError::database(format!(
                "Injected failure writing status '{status}'"
            )));
        }
        Ok(())
    }

    fn record(&self, job: &Job) {
        self.history.entry(job.id).or_default().push(job.status);
    }

    fn count_where(&self, predicate: impl Fn(&Job) -> bool) -> i64 {
        self.jobs.iter().filter(|entry| predicate(entry.value())).count() as i64
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &Job) -> AppResult<()> {
        self.check_write(job.status)?;
        if self.jobs.contains_key(&job.id) {
            return Err(AppError::database(format!("Job {} already exists", job.id)));
        }
        self.jobs.insert(job.id, job.clone());
        self.record(job);
        debug!(job_id = %job.id, job_type = %job.job_type, "Stored job");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        self.check_read()?;
        Ok(self.snapshot(id))
    }

    async fn update(&self, job: &Job) -> AppResult<()> {
        self.check_write(job.status)?;
        match self.jobs.get_mut(&job.id) {
            Some(mut entry) => {
                *entry = job.clone();
            }
            None => return Err(AppError::not_found(format!("Job {} not found", job.id))),
        }
        self.record(job);
        Ok(())
    }

    async fn list(&self, status: Option<JobStatus>, limit: i64) -> AppResult<Vec<Job>> {
        self.check_read()?;
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| status.is_none_or(|s| entry.value().status == s))
            .map(|entry| entry.value().clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(effective_limit(limit) as usize);
        Ok(jobs)
    }

    async fn count(&self, status: Option<JobStatus>) -> AppResult<i64> {
        self.check_read()?;
        Ok(self.count_where(|job| status.is_none_or(|s| job.status == s)))
    }

    async fn count_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<i64> {
        self.check_read()?;
        Ok(self.count_where(|job| job.created_at >= from && job.created_at < to))
    }

    async fn count_updated_between(
        &self,
        status: JobStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<i64> {
        self.check_read()?;
        Ok(self.count_where(|job| {
            job.status == status && job.updated_at >= from && job.updated_at < to
        }))
    }

    async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        self.check_read()?;
        let mut removed = 0u64;
        self.jobs.retain(|_, job| {
            let expired = job.status == JobStatus::Completed && job.updated_at < cutoff;
            if expired {
                removed += 1;
            }
            !expired
        });
        Ok(removed)
    }
}
