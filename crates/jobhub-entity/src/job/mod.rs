//! Background job domain entities.

pub mod model;
pub mod status;

pub use model::{Job, JobResult, NewJob};
pub use status::JobStatus;
