//! PostgreSQL repository implementations.

pub mod job;
