//! CLI command definitions and dispatch.

pub mod job;
pub mod migrate;
pub mod run;
pub mod submit;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use jobhub_core::config::AppConfig;
use jobhub_core::error::AppError;
use jobhub_database::{DatabasePool, PgJobRepository};
use jobhub_queue::QueueManager;

use crate::output::OutputFormat;

/// JobHub: queue-driven job worker and scheduler
#[derive(Debug, Parser)]
#[command(name = "jobhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the queue consumer and the scheduler until interrupted
    Run(run::RunArgs),
    /// Create a job and enqueue it
    Submit(submit::SubmitArgs),
    /// Show a single job
    Get(job::GetArgs),
    /// List jobs, newest first
    List(job::ListArgs),
    /// Show job counts per status
    Status,
    /// Apply database migrations
    Migrate,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Run(args) => run::execute(args, config).await,
            Commands::Submit(args) => submit::execute(args, &config, self.format).await,
            Commands::Get(args) => job::get(args, &config, self.format).await,
            Commands::List(args) => job::list(args, &config, self.format).await,
            Commands::Status => job::status(&config, self.format).await,
            Commands::Migrate => migrate::execute(&config).await,
        }
    }
}

/// Helper: connect to the database and build the job store
pub async fn create_job_store(config: &AppConfig) -> Result<Arc<PgJobRepository>, AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    Ok(Arc::new(PgJobRepository::new(pool.into_pool())))
}

/// Helper: build the configured queue provider
pub async fn create_queue(config: &AppConfig) -> Result<Arc<QueueManager>, AppError> {
    Ok(Arc::new(QueueManager::new(&config.queue).await?))
}
