//! # jobhub-entity
//!
//! Domain entity models for JobHub: the [`job::Job`] record, its status
//! state machine, and the validated submission input.

pub mod job;
