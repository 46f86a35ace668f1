//! Core traits defined in `jobhub-core` and implemented by other crates.

pub mod clock;
pub mod queue;

pub use clock::{Clock, SystemClock, TokioClock};
pub use queue::{JobMessage, MessageQueue, QueueMessage};
