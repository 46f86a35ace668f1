//! Health report and daily aggregation job handlers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};
use tracing;

use jobhub_core::traits::Clock;
use jobhub_database::JobStore;
use jobhub_entity::job::{Job, JobResult, JobStatus};

use super::types;
use crate::executor::{JobExecutionError, JobHandler};

/// Counts jobs per status
#[derive(Debug)]
pub struct HealthReportJobHandler {
    /// Job store
    store: Arc<dyn JobStore>,
    /// Time source
    clock: Arc<dyn Clock>,
}

impl HealthReportJobHandler {
    /// Create a new health report handler
    pub fn new(store: Arc<dyn JobStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl JobHandler for HealthReportJobHandler {
    fn job_type(&self) -> &str {
        types::HEALTH_REPORT
    }

    async fn execute(&self, _job: &Job) -> Result<JobResult, JobExecutionError> {
        let total = self.store.count(None).await?;
        let pending = self.store.count(Some(JobStatus::Pending)).await?;
        let processing = self.store.count(Some(JobStatus::Processing)).await?;
        let completed = self.store.count(Some(JobStatus::Completed)).await?;
        let failed = self.store.count(Some(JobStatus::Failed)).await?;

        tracing::info!(
            total,
            pending,
            processing,
            completed,
            failed,
            "Health report generated"
        );

        Ok(JobResult {
            processed_at: self.clock.now(),
            input_count: total,
            message: format!(
                "Health report: Total={total}, Pending={pending}, Processing={processing}, \
                 Completed={completed}, Failed={failed}"
            ),
        })
    }
}

/// The previous local calendar day as a half-open UTC range
/// `[yesterday 00:00, today 00:00)`, plus that day's date.
///
/// Returns `None` when local midnight does not exist on either boundary.
pub fn previous_day_window(
    now: DateTime<Local>,
) -> Option<(DateTime<Utc>, DateTime<Utc>, NaiveDate)> {
    let today = now.date_naive();
    let yesterday = today.checked_sub_days(Days::new(1))?;
    let start = local_midnight(yesterday)?;
    let end = local_midnight(today)?;
    Some((start, end, yesterday))
}

fn local_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Summarizes jobs created, completed, and failed during the previous day
#[derive(Debug)]
pub struct AggregationJobHandler {
    /// Job store
    store: Arc<dyn JobStore>,
    /// Time source
    clock: Arc<dyn Clock>,
}

impl AggregationJobHandler {
    /// Create a new aggregation handler
    pub fn new(store: Arc<dyn JobStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl JobHandler for AggregationJobHandler {
    fn job_type(&self) -> &str {
        types::DATA_AGGREGATION
    }

    async fn execute(&self, _job: &Job) -> Result<JobResult, JobExecutionError> {
        let (from, to, day) = previous_day_window(self.clock.now_local()).ok_or_else(|| {
            JobExecutionError::Permanent("Cannot determine previous local day".to_string())
        })?;

        let created = self.store.count_created_between(from, to).await?;
        let completed = self
            .store
            .count_updated_between(JobStatus::Completed, from, to)
            .await?;
        let failed = self
            .store
            .count_updated_between(JobStatus::Failed, from, to)
            .await?;

        let date = day.format("%Y-%m-%d");
        tracing::info!(
            %date,
            created,
            completed,
            failed,
            "Daily aggregation completed"
        );

        Ok(JobResult {
            processed_at: self.clock.now(),
            input_count: created,
            message: format!(
                "Aggregated stats for {date}: Created={created}, Completed={completed}, Failed={failed}"
            ),
        })
    }
}
