//! PostgreSQL job repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use jobhub_core::error::{AppError, ErrorKind};
use jobhub_core::result::AppResult;
use jobhub_entity::job::{Job, JobResult, JobStatus};

use crate::store::{JobStore, effective_limit};

/// Row shape of the `jobs` table.
#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    status: JobStatus,
    job_type: String,
    data: String,
    result: Option<Json<JobResult>>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
            job_type: row.job_type,
            data: row.data,
            result: row.result.map(|Json(result)| result),
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn db_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

/// Job store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobRepository {
    async fn create(&self, job: &Job) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO jobs (id, status, job_type, data, result, error, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(job.id)
        .bind(job.status)
        .bind(&job.job_type)
        .bind(&job.data)
        .bind(job.result.as_ref().map(Json))
        .bind(job.error.as_deref())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to create job"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find job"))?;
        Ok(row.map(Job::from))
    }

    async fn update(&self, job: &Job) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = $2, job_type = $3, data = $4, result = $5, error = $6, \
             updated_at = $7 WHERE id = $1",
        )
        .bind(job.id)
        .bind(job.status)
        .bind(&job.job_type)
        .bind(&job.data)
        .bind(job.result.as_ref().map(Json))
        .bind(job.error.as_deref())
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update job"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Job {} not found", job.id)));
        }
        Ok(())
    }

    async fn list(&self, status: Option<JobStatus>, limit: i64) -> AppResult<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs WHERE ($1::job_status IS NULL OR status = $1) \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(status)
        .bind(effective_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list jobs"))?;
        Ok(rows.into_iter().map(Job::from).collect())
    }

    async fn count(&self, status: Option<JobStatus>) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE ($1::job_status IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count jobs"))
    }

    async fn count_created_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE created_at >= $1 AND created_at < $2")
            .bind(from)
            .bind(to)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count created jobs"))
    }

    async fn count_updated_between(
        &self,
        status: JobStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE status = $1 AND updated_at >= $2 AND updated_at < $3",
        )
        .bind(status)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to count updated jobs"))
    }

    async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM jobs WHERE status = 'completed' AND updated_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to cleanup jobs"))?;
        Ok(result.rows_affected())
    }
}
