//! Scheduler cadences driven by tokio's paused clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use jobhub_core::result::AppResult;
use jobhub_database::JobStore;
use jobhub_entity::job::{Job, JobStatus};
use jobhub_worker::Scheduler;
use jobhub_worker::scheduler::BatchImportScan;

use crate::helpers::{TestHarness, local};

const TRIGGERS: [&str; 4] = [
    "cleanup",
    "health-report",
    "data-aggregation",
    "batch-import-scan",
];

struct RunningScheduler {
    scheduler: Arc<Scheduler>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<AppResult<()>>,
}

impl RunningScheduler {
    fn start(harness: &TestHarness) -> Self {
        let mut scheduler = Scheduler::new(harness.clock.clone());
        scheduler.register_default_triggers(harness.submitter(), harness.store.clone());
        let scheduler = Arc::new(scheduler);

        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run(rx).await }
        });
        Self {
            scheduler,
            shutdown,
            handle,
        }
    }

    fn firings(&self) -> Vec<u64> {
        TRIGGERS
            .iter()
            .map(|name| self.scheduler.firings(name))
            .collect()
    }

    async fn stop(self) {
        self.shutdown.send(true).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

fn harness_at(origin: DateTime<Utc>) -> TestHarness {
    TestHarness::starting_at(origin)
}

#[tokio::test(start_paused = true)]
async fn test_registers_four_triggers() {
    let harness = TestHarness::new();
    let running = RunningScheduler::start(&harness);
    assert_eq!(running.scheduler.trigger_names(), TRIGGERS);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_only_batch_scan_fires_in_first_65_seconds() {
    let harness = harness_at(local(2026, 1, 14, 10, 0, 10));
    let running = RunningScheduler::start(&harness);

    tokio::time::sleep(Duration::from_secs(65)).await;

    assert_eq!(running.firings(), vec![0, 0, 0, 2]);
    assert!(harness.store.is_empty());
    assert!(harness.queue.is_empty().await);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_fires_every_five_minutes() {
    let harness = harness_at(local(2026, 1, 14, 10, 0, 10));
    let running = RunningScheduler::start(&harness);

    tokio::time::sleep(Duration::from_secs(5 * 60 - 1)).await;
    assert_eq!(running.scheduler.firings("cleanup"), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(running.scheduler.firings("cleanup"), 1);

    let jobs = harness.store.list(None, 0).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job_type, "cleanup");
    assert_eq!(jobs[0].data, "Remove completed jobs older than 7 days");
    assert_eq!(jobs[0].status, JobStatus::Pending);
    assert_eq!(harness.queue.len().await, 1);

    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(running.scheduler.firings("cleanup"), 2);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_health_report_fires_on_the_hour() {
    let harness = harness_at(local(2026, 1, 14, 10, 59, 50));
    let running = RunningScheduler::start(&harness);

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(running.scheduler.firings("health-report"), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(running.scheduler.firings("health-report"), 1);

    let jobs = harness.store.list_pending(10).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job_type, "health-report");
    assert!(
        jobs[0]
            .data
            .starts_with("Generate system health report at 2026-01-14T11:00:00")
    );

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(running.scheduler.firings("health-report"), 2);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_aggregation_fires_daily_at_two() {
    let harness = harness_at(local(2026, 1, 14, 1, 59, 0));
    let running = RunningScheduler::start(&harness);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(running.scheduler.firings("data-aggregation"), 1);

    let aggregation: Vec<Job> = harness
        .store
        .list(None, 0)
        .await
        .unwrap()
        .into_iter()
        .filter(|job| job.job_type == "data-aggregation")
        .collect();
    assert_eq!(aggregation.len(), 1);
    assert_eq!(aggregation[0].data, "Aggregate daily metrics and statistics");

    tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
    assert_eq!(running.scheduler.firings("data-aggregation"), 2);
    running.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_batch_import_scan_counts_recent_pending_imports() {
    let harness = TestHarness::new();
    let now = Utc::now();
    harness.store.seed(Job::new("batch-import", "a", now));
    harness.store.seed(Job::new("batch-import", "b", now));
    harness.store.seed(Job::new("data-processing", "c", now));
    let mut done = Job::new("batch-import", "d", now);
    done.mark_processing(now);
    harness.store.seed(done);

    let scan = BatchImportScan::new(harness.store.clone());
    assert_eq!(scan.scan().await.unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_after_first_scan() {
    let harness = harness_at(local(2026, 1, 14, 10, 0, 10));
    let running = RunningScheduler::start(&harness);

    tokio::time::sleep(Duration::from_secs(31)).await;
    let fired = running.firings();
    running.stop().await;

    assert_eq!(fired, vec![0, 0, 0, 1]);
}
