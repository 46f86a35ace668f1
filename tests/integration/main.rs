//! End-to-end tests of the job pipeline against the in-memory ports.

mod helpers;
mod pipeline_test;
mod scheduler_test;
