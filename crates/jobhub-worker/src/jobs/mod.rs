//! Built-in job handler implementations.

pub mod cleanup;
pub mod generic;
pub mod import;
pub mod processing;
pub mod report;

pub use cleanup::CleanupJobHandler;
pub use generic::GenericJobHandler;
pub use import::BatchImportJobHandler;
pub use processing::DataProcessingJobHandler;
pub use report::{AggregationJobHandler, HealthReportJobHandler};

/// Job type keys understood by the built-in handlers.
pub mod types {
    /// Removes old completed jobs.
    pub const CLEANUP: &str = "cleanup";
    /// Counts jobs per status.
    pub const HEALTH_REPORT: &str = "health-report";
    /// Summarizes the previous local day.
    pub const DATA_AGGREGATION: &str = "data-aggregation";
    /// Simulated record import.
    pub const BATCH_IMPORT: &str = "batch-import";
    /// Simulated payload processing.
    pub const DATA_PROCESSING: &str = "data-processing";
}
