//! Injectable time source.
//!
//! Handlers and the scheduler read "now" through a [`Clock`] so that tests
//! can pin the calendar date and drive elapsed time with tokio's paused
//! clock.

use std::fmt;

use chrono::{DateTime, Local, Utc};

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug + 'static {
    /// Current time in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current time in the process-local timezone.
    fn now_local(&self) -> DateTime<Local> {
        self.now().with_timezone(&Local)
    }
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock anchored at a fixed origin that advances with `tokio::time`.
///
/// Under `tokio::time::pause()` the reported time only moves when the
/// runtime auto-advances or `tokio::time::advance` is called, which makes
/// calendar arithmetic deterministic.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioClock {
    /// Create a clock reporting `origin` right now.
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.origin + elapsed
    }
}
