//! # jobhub-database
//!
//! The [`JobStore`] persistence port, its PostgreSQL implementation, an
//! in-memory implementation for tests and local runs, and connection and
//! migration management.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryJobStore;
pub use repositories::job::PgJobRepository;
pub use store::JobStore;
