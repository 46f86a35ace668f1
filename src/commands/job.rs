//! Job inspection commands.

use clap::Args;
use serde::Serialize;

use jobhub_core::config::AppConfig;
use jobhub_core::error::AppError;
use jobhub_database::JobStore;
use jobhub_entity::job::JobStatus;

use crate::output::{self, OutputFormat};

/// Arguments for the get command
#[derive(Debug, Args)]
pub struct GetArgs {
    /// Job ID
    pub id: String,
}

/// Arguments for the list command
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only show jobs in this status
    #[arg(short, long)]
    pub status: Option<JobStatus>,
    /// Maximum number of jobs; non-positive means the default of 100
    #[arg(short, long, default_value_t = 100, allow_negative_numbers = true)]
    pub limit: i64,
}

/// Job counts per status
#[derive(Debug, Serialize)]
struct StatusReport {
    total: i64,
    pending: i64,
    processing: i64,
    completed: i64,
    failed: i64,
}

/// Show a single job
pub async fn get(args: &GetArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let store = super::create_job_store(config).await?;
    let job = store.get(&args.id).await?;
    output::print_job(&job, format);
    Ok(())
}

/// List jobs newest first
pub async fn list(
    args: &ListArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let store = super::create_job_store(config).await?;
    let jobs = store.list(args.status, args.limit).await?;
    output::print_jobs(&jobs, format);
    Ok(())
}

/// Show job counts per status
pub async fn status(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let store = super::create_job_store(config).await?;

    let report = StatusReport {
        total: store.count(None).await?,
        pending: store.count(Some(JobStatus::Pending)).await?,
        processing: store.count(Some(JobStatus::Processing)).await?,
        completed: store.count(Some(JobStatus::Completed)).await?,
        failed: store.count(Some(JobStatus::Failed)).await?,
    };

    match format {
        OutputFormat::Table => {
            println!("Job Status:");
            output::print_kv("Total", &report.total.to_string());
            output::print_kv("Pending", &report.pending.to_string());
            output::print_kv("Processing", &report.processing.to_string());
            output::print_kv("Completed", &report.completed.to_string());
            output::print_kv("Failed", &report.failed.to_string());
            output::print_kv("Queue provider", &config.queue.provider);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
