//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use jobhub_entity::job::Job;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// One table row per job
#[derive(Debug, Serialize, Tabled)]
pub struct JobRow {
    /// Job ID
    #[tabled(rename = "ID")]
    pub id: String,
    /// Job type
    #[tabled(rename = "Type")]
    pub job_type: String,
    /// Status
    #[tabled(rename = "Status")]
    pub status: String,
    /// Creation time
    #[tabled(rename = "Created")]
    pub created_at: String,
    /// Last status change
    #[tabled(rename = "Updated")]
    pub updated_at: String,
    /// Result message or error text
    #[tabled(rename = "Outcome")]
    pub outcome: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        let outcome = match (&job.result, &job.error) {
            (Some(result), _) => result.message.clone(),
            (None, Some(error)) => error.clone(),
            (None, None) => String::new(),
        };
        Self {
            id: job.id.to_string(),
            job_type: job.job_type.clone(),
            status: job.status.to_string(),
            created_at: job.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: job.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            outcome,
        }
    }
}

/// Print a list of jobs in the selected format
pub fn print_jobs(jobs: &[Job], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if jobs.is_empty() {
                println!("No results found.");
            } else {
                let rows: Vec<JobRow> = jobs.iter().map(JobRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(jobs).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a single job in the selected format
pub fn print_job(job: &Job, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            print_kv("ID", &job.id.to_string());
            print_kv("Type", &job.job_type);
            print_kv("Status", job.status.as_str());
            print_kv("Data", &job.data);
            print_kv("Created", &job.created_at.to_rfc3339());
            print_kv("Updated", &job.updated_at.to_rfc3339());
            if let Some(result) = &job.result {
                print_kv("Processed", &result.processed_at.to_rfc3339());
                print_kv("Input count", &result.input_count.to_string());
                print_kv("Message", &result.message);
            }
            if let Some(error) = &job.error {
                print_kv("Error", error);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(job).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{}:", key), value);
}
