//! In-memory queue provider.

pub mod queue;

pub use queue::MemoryQueue;
