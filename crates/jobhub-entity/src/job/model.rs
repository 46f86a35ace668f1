//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::status::JobStatus;

/// Outcome recorded on a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// When the handler finished.
    pub processed_at: DateTime<Utc>,
    /// Handler-specific count (records, rows deleted, payload length, ...).
    pub input_count: i64,
    /// Human-readable summary.
    pub message: String,
}

/// A background job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: Uuid,
    /// Current job status.
    pub status: JobStatus,
    /// Job type key selecting the handler (e.g. `"cleanup"`).
    #[serde(rename = "type")]
    pub job_type: String,
    /// Opaque payload.
    pub data: String,
    /// Set iff the job is completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    /// Set iff the job failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job last changed status.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(job_type: impl Into<String>, data: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            job_type: job_type.into(),
            data: data.into(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `Processing`, returning the status it was in before.
    ///
    /// The caller decides what to do with an illegal predecessor; the
    /// entity only records the change.
    pub fn mark_processing(&mut self, now: DateTime<Utc>) -> JobStatus {
        let previous = self.status;
        self.status = JobStatus::Processing;
        self.updated_at = now;
        previous
    }

    /// Move to `Completed` with a result. Clears any earlier error.
    pub fn mark_completed(&mut self, result: JobResult, now: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.updated_at = now;
    }

    /// Move to `Failed` with an error message. Clears any earlier result.
    pub fn mark_failed(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.result = None;
        self.updated_at = now;
    }

    /// Whether the result/error fields agree with the status.
    pub fn outcome_is_consistent(&self) -> bool {
        match self.status {
            JobStatus::Completed => self.result.is_some() && self.error.is_none(),
            JobStatus::Failed => self.error.is_some() && self.result.is_none(),
            JobStatus::Pending | JobStatus::Processing => true,
        }
    }
}

/// Submission input for a new job.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewJob {
    /// Job type key.
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 100))]
    pub job_type: String,
    /// Payload.
    #[validate(length(min = 1, max = 10000))]
    pub data: String,
}

impl NewJob {
    /// Create submission input.
    pub fn new(job_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            job_type: job_type.into(),
            data: data.into(),
        }
    }

    /// Build the pending job record.
    pub fn into_job(self, now: DateTime<Utc>) -> Job {
        Job::new(self.job_type, self.data, now)
    }
}
