//! Background job processing and scheduled tasks for JobHub.
//!
//! This crate provides:
//! - A worker runner that long-polls the queue and executes jobs
//! - A scheduler that creates maintenance and reporting jobs on a cadence
//! - A job executor that dispatches jobs to the correct handler
//! - A submitter shared by the scheduler and the CLI
//! - Built-in job implementations for cleanup, reports, and imports

pub mod executor;
pub mod jobs;
pub mod runner;
pub mod scheduler;
pub mod submitter;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use runner::{WorkerRunner, WorkerStats};
pub use scheduler::{Cadence, Scheduler};
pub use submitter::JobSubmitter;
