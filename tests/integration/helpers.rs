//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use jobhub_core::config::WorkerConfig;
use jobhub_core::traits::TokioClock;
use jobhub_database::MemoryJobStore;
use jobhub_queue::memory::MemoryQueue;
use jobhub_worker::{JobExecutor, JobSubmitter, WorkerRunner};

/// Visibility timeout used by the test queue
pub const VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// In-memory ports plus a clock that follows tokio's paused time
pub struct TestHarness {
    /// Job store
    pub store: Arc<MemoryJobStore>,
    /// Message queue
    pub queue: Arc<MemoryQueue>,
    /// Time source shared by every component
    pub clock: Arc<TokioClock>,
}

impl TestHarness {
    /// Create a harness whose clock starts at `origin`
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            store: Arc::new(MemoryJobStore::new()),
            queue: Arc::new(MemoryQueue::new(VISIBILITY_TIMEOUT)),
            clock: Arc::new(TokioClock::starting_at(origin)),
        }
    }

    /// Create a harness at a fixed winter date
    pub fn new() -> Self {
        Self::starting_at(local(2026, 1, 14, 9, 0, 0))
    }

    /// Submitter wired to the harness ports
    pub fn submitter(&self) -> JobSubmitter {
        JobSubmitter::new(self.store.clone(), self.queue.clone(), self.clock.clone())
    }

    /// Executor with the built-in handlers
    pub fn executor(&self) -> JobExecutor {
        JobExecutor::with_default_handlers(self.store.clone(), self.clock.clone())
    }

    /// Consumer loop using `executor`
    pub fn runner(&self, executor: JobExecutor) -> Arc<WorkerRunner> {
        Arc::new(WorkerRunner::new(
            self.queue.clone(),
            self.store.clone(),
            Arc::new(executor),
            self.clock.clone(),
            WorkerConfig::default(),
        ))
    }

    /// Spawn a consumer loop with the built-in handlers
    pub fn spawn_runner(&self) -> RunningWorker {
        RunningWorker::spawn(self.runner(self.executor()))
    }
}

/// A consumer loop running on its own task
pub struct RunningWorker {
    /// The runner, for reading stats
    pub runner: Arc<WorkerRunner>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RunningWorker {
    /// Start `runner` on a new task
    pub fn spawn(runner: Arc<WorkerRunner>) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let runner = Arc::clone(&runner);
            async move { runner.run(rx).await }
        });
        Self {
            runner,
            shutdown,
            handle,
        }
    }

    /// Signal shutdown and wait for the loop to exit
    pub async fn stop(self) {
        self.shutdown.send(true).expect("runner dropped its receiver");
        self.handle.await.expect("runner task panicked");
    }
}

/// A local wall-clock time as UTC
pub fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    let naive = NaiveDate::from_ymd_opt(y, mo, d)
        .and_then(|date| date.and_hms_opt(h, mi, s))
        .expect("valid date");
    Local
        .from_local_datetime(&naive)
        .earliest()
        .expect("local time exists")
        .with_timezone(&Utc)
}
