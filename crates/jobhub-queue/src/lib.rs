//! # jobhub-queue
//!
//! Queue provider implementations for JobHub. Supports two modes:
//!
//! - **sqs**: Amazon SQS (or a compatible endpoint such as LocalStack)
//! - **memory**: In-process queue with visibility-timeout redelivery
//!
//! The provider is selected at runtime based on configuration.

#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "sqs")]
pub mod sqs;

pub use provider::QueueManager;
