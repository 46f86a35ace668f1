//! Amazon SQS queue provider.

pub mod client;

pub use client::SqsQueue;
