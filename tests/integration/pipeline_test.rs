//! Submission through consumer loop to stored outcome.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use jobhub_core::traits::MessageQueue;
use jobhub_database::JobStore;
use jobhub_entity::job::{Job, JobResult, JobStatus, NewJob};
use jobhub_worker::{JobExecutionError, JobHandler};

use crate::helpers::{RunningWorker, TestHarness, VISIBILITY_TIMEOUT};

#[derive(Debug)]
struct Rejecting;

#[async_trait]
impl JobHandler for Rejecting {
    fn job_type(&self) -> &str {
        "rejecting"
    }

    async fn execute(&self, _job: &Job) -> Result<JobResult, JobExecutionError> {
        Err(JobExecutionError::Permanent("record 3 is invalid".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_jobs_of_every_type_complete() {
    let harness = TestHarness::new();
    let submitter = harness.submitter();

    let jobs = vec![
        submitter
            .submit(NewJob::new("data-processing", "abcdefghij"))
            .await
            .unwrap(),
        submitter
            .submit(NewJob::new("batch-import", "x".repeat(55)))
            .await
            .unwrap(),
        submitter
            .submit(NewJob::new("health-report", "now"))
            .await
            .unwrap(),
        submitter
            .submit(NewJob::new("send-email", "hello"))
            .await
            .unwrap(),
    ];

    let worker = harness.spawn_runner();
    tokio::time::sleep(Duration::from_secs(5)).await;

    for job in &jobs {
        let stored = harness.store.snapshot(job.id).unwrap();
        assert_eq!(stored.status, JobStatus::Completed, "{}", job.job_type);
        assert!(stored.outcome_is_consistent());
        assert_eq!(
            harness.store.history(job.id),
            vec![JobStatus::Pending, JobStatus::Processing, JobStatus::Completed]
        );
        assert!(stored.updated_at > stored.created_at);
    }
    assert!(harness.queue.is_empty().await);

    let stats = worker.runner.stats().snapshot();
    assert_eq!(stats.completed, 4);
    assert_eq!(stats.skipped, 0);
    worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_handler_durations() {
    let harness = TestHarness::new();
    let runner = harness.runner(harness.executor());
    let submitter = harness.submitter();

    let cases = [
        ("batch-import", "x".repeat(55), Duration::from_millis(500)),
        ("data-processing", "y".repeat(20), Duration::from_millis(200)),
        ("unknown-kind", "z".repeat(3000), Duration::from_secs(1)),
        ("unknown-kind", "z".to_string(), Duration::from_secs(1)),
    ];

    for (job_type, data, expected) in cases {
        submitter.submit(NewJob::new(job_type, data)).await.unwrap();
        let batch = harness
            .queue
            .receive(1, Duration::ZERO)
            .await
            .unwrap();

        let start = Instant::now();
        runner.process_message(&batch[0]).await;
        assert_eq!(start.elapsed(), expected, "{job_type}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_handler_error_marks_job_failed_and_deletes_message() {
    let harness = TestHarness::new();
    let mut executor = harness.executor();
    executor.register(Arc::new(Rejecting));
    let worker = RunningWorker::spawn(harness.runner(executor));

    let job = harness
        .submitter()
        .submit(NewJob::new("rejecting", "rows"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let stored = harness.store.snapshot(job.id).unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.error.as_deref(), Some("record 3 is invalid"));
    assert!(stored.result.is_none());
    assert!(harness.queue.is_empty().await);
    assert_eq!(worker.runner.stats().snapshot().failed, 1);
    worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_receive_error_retries_after_backoff() {
    let harness = TestHarness::new();
    harness.queue.fail_next_receives(1);
    let job = harness
        .submitter()
        .submit(NewJob::new("data-processing", "ab"))
        .await
        .unwrap();

    let worker = harness.spawn_runner();

    tokio::time::sleep(Duration::from_millis(4_990)).await;
    assert_eq!(harness.queue.receive_calls(), 1);
    assert_eq!(
        harness.store.snapshot(job.id).unwrap().status,
        JobStatus::Pending
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(harness.queue.receive_calls() >= 2);
    assert_eq!(
        harness.store.snapshot(job.id).unwrap().status,
        JobStatus::Completed
    );
    assert!(harness.queue.is_empty().await);
    assert_eq!(worker.runner.stats().snapshot().receive_errors, 1);
    worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_message_is_left_for_redelivery() {
    let harness = TestHarness::new();
    harness.queue.push_raw(Some("not an envelope".to_string())).await;
    harness.queue.push_raw(None).await;

    let worker = harness.spawn_runner();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.queue.in_flight_len().await, 2);
    assert_eq!(worker.runner.stats().snapshot().skipped, 2);

    tokio::time::sleep(VISIBILITY_TIMEOUT).await;
    assert_eq!(harness.queue.len().await, 2);
    assert_eq!(worker.runner.stats().snapshot().skipped, 4);
    assert!(harness.store.is_empty());
    worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_store_outage_keeps_message() {
    let harness = TestHarness::new();
    let job = harness
        .submitter()
        .submit(NewJob::new("data-processing", "ab"))
        .await
        .unwrap();
    harness.store.set_fail_reads(true);

    let worker = harness.spawn_runner();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.queue.in_flight_len().await, 1);
    assert_eq!(
        harness.store.snapshot(job.id).unwrap().status,
        JobStatus::Pending
    );

    harness.store.clear_failures();
    tokio::time::sleep(VISIBILITY_TIMEOUT).await;
    assert_eq!(
        harness.store.snapshot(job.id).unwrap().status,
        JobStatus::Completed
    );
    assert!(harness.queue.is_empty().await);
    worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_delete_leads_to_reprocessing() {
    let harness = TestHarness::new();
    harness.queue.set_fail_deletes(true);
    let job = harness
        .submitter()
        .submit(NewJob::new("data-processing", "ab"))
        .await
        .unwrap();

    let worker = harness.spawn_runner();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        harness.store.snapshot(job.id).unwrap().status,
        JobStatus::Completed
    );
    assert_eq!(worker.runner.stats().snapshot().delete_errors, 1);

    harness.queue.set_fail_deletes(false);
    tokio::time::sleep(VISIBILITY_TIMEOUT).await;

    // The redelivered message runs the completed job again.
    assert_eq!(
        harness.store.history(job.id),
        vec![
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Processing,
            JobStatus::Completed
        ]
    );
    assert!(harness.queue.is_empty().await);
    worker.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_abandons_long_poll() {
    let harness = TestHarness::new();
    let worker = harness.spawn_runner();

    tokio::time::sleep(Duration::from_secs(3)).await;
    let start = Instant::now();
    worker.stop().await;
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_get_reports_missing_and_invalid_ids() {
    let harness = TestHarness::new();
    let job = harness
        .submitter()
        .submit(NewJob::new("cleanup", "now"))
        .await
        .unwrap();

    assert_eq!(harness.store.get(&job.id.to_string()).await.unwrap().id, job.id);
    assert!(
        harness
            .store
            .get("00000000-0000-0000-0000-000000000000")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(!harness.store.get("12345").await.unwrap_err().is_not_found());
}
