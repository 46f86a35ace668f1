//! Job submission command.

use std::sync::Arc;

use clap::Args;

use jobhub_core::config::{AppConfig, QueueConfig};
use jobhub_core::error::AppError;
use jobhub_core::traits::SystemClock;
use jobhub_entity::job::NewJob;
use jobhub_worker::JobSubmitter;

use crate::output::{self, OutputFormat};

/// Arguments for the submit command
#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Job type (e.g. data-processing, batch-import)
    #[arg(short = 't', long = "type")]
    pub job_type: String,
    /// Job payload
    #[arg(short, long)]
    pub data: String,
}

/// Create a pending job and enqueue its ID
pub async fn execute(
    args: &SubmitArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    require_shared_queue(&config.queue)?;
    let store = super::create_job_store(config).await?;
    let queue = super::create_queue(config).await?;
    let submitter = JobSubmitter::new(store, queue, Arc::new(SystemClock));

    let job = submitter
        .submit(NewJob::new(args.job_type.clone(), args.data.clone()))
        .await?;

    if format == OutputFormat::Table {
        output::print_success(&format!("Job '{}' enqueued (id: {})", job.job_type, job.id));
    }
    output::print_job(&job, format);
    Ok(())
}

/// Reject queue providers whose messages die with this process.
fn require_shared_queue(config: &QueueConfig) -> Result<(), AppError> {
    if config.provider == "memory" {
        return Err(AppError::configuration(
            "The memory queue only lives inside one process; submit needs queue.provider = \"sqs\"",
        ));
    }
    Ok(())
}
