//! Periodic scheduler for maintenance and reporting jobs.
//!
//! Each trigger runs its own loop. Fixed intervals are measured from the
//! moment the scheduler starts; calendar cadences are computed from the
//! injected [`Clock`] in local time. Firings are spawned onto a
//! [`TaskTracker`], so a slow firing never delays the next one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Timelike};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use tracing;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::traits::Clock;
use jobhub_database::JobStore;
use jobhub_entity::job::NewJob;

use crate::jobs::types;
use crate::submitter::JobSubmitter;

/// When a trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every fixed period, first firing one period after start.
    Every(Duration),
    /// At minute zero of every local hour.
    Hourly,
    /// Once a day at the given local wall-clock time.
    DailyAt {
        /// Hour of day, `0..24`.
        hour: u32,
        /// Minute of hour, `0..60`.
        minute: u32,
    },
}

impl Cadence {
    /// Reject cadences that can never fire.
    pub fn validate(&self) -> AppResult<()> {
        match *self {
            Self::Every(period) if period.is_zero() => Err(AppError::configuration(
                "Interval cadence must be greater than zero",
            )),
            Self::DailyAt { hour, minute } if hour >= 24 || minute >= 60 => {
                Err(AppError::configuration(format!(
                    "Invalid daily time {hour:02}:{minute:02}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Next calendar firing strictly after `now`. `None` for interval
    /// cadences, which do not depend on the calendar.
    pub fn next_after(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        let naive = now.naive_local();
        let candidate = match *self {
            Self::Every(_) => return None,
            Self::Hourly => {
                naive.date().and_hms_opt(naive.hour(), 0, 0)? + chrono::Duration::hours(1)
            }
            Self::DailyAt { hour, minute } => {
                let today = naive.date().and_hms_opt(hour, minute, 0)?;
                if today > naive {
                    today
                } else {
                    today + chrono::Duration::days(1)
                }
            }
        };
        resolve_local(candidate).filter(|next| *next > now)
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Every(period) => write!(f, "every {period:?}"),
            Self::Hourly => write!(f, "hourly"),
            Self::DailyAt { hour, minute } => write!(f, "daily at {hour:02}:{minute:02}"),
        }
    }
}

/// Map a local wall-clock time to an instant. Times skipped by a DST
/// change move forward to the first hour that exists.
fn resolve_local(mut naive: NaiveDateTime) -> Option<DateTime<Local>> {
    for _ in 0..3 {
        if let Some(dt) = Local.from_local_datetime(&naive).earliest() {
            return Some(dt);
        }
        naive += chrono::Duration::hours(1);
    }
    None
}

/// Work performed when a trigger fires
#[async_trait]
pub trait TriggerAction: Send + Sync + std::fmt::Debug {
    /// Run one firing
    async fn fire(&self) -> AppResult<()>;
}

/// Submits a new job of a fixed type
#[derive(Debug)]
pub struct SubmitJob {
    submitter: JobSubmitter,
    clock: Arc<dyn Clock>,
    job_type: &'static str,
    describe: fn(DateTime<Local>) -> String,
}

impl SubmitJob {
    /// Create an action whose payload is built from the firing time
    pub fn new(
        submitter: JobSubmitter,
        clock: Arc<dyn Clock>,
        job_type: &'static str,
        describe: fn(DateTime<Local>) -> String,
    ) -> Self {
        Self {
            submitter,
            clock,
            job_type,
            describe,
        }
    }
}

#[async_trait]
impl TriggerAction for SubmitJob {
    async fn fire(&self) -> AppResult<()> {
        tracing::info!("Running scheduled {} job", self.job_type);
        let data = (self.describe)(self.clock.now_local());
        self.submitter
            .submit(NewJob::new(self.job_type, data))
            .await
            .map(|_| ())
    }
}

/// Looks for pending batch imports among the most recent pending jobs
#[derive(Debug)]
pub struct BatchImportScan {
    store: Arc<dyn JobStore>,
}

impl BatchImportScan {
    /// Pending jobs inspected per scan.
    pub const SCAN_LIMIT: i64 = 10;

    /// Create the scan action
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Count pending batch-import jobs among the latest pending jobs
    pub async fn scan(&self) -> AppResult<usize> {
        let pending = self.store.list_pending(Self::SCAN_LIMIT).await?;
        Ok(pending
            .iter()
            .filter(|job| job.job_type == types::BATCH_IMPORT)
            .count())
    }
}

#[async_trait]
impl TriggerAction for BatchImportScan {
    async fn fire(&self) -> AppResult<()> {
        let count = self.scan().await?;
        if count > 0 {
            tracing::info!("Found {} batch import jobs to process", count);
        }
        Ok(())
    }
}

/// A registered trigger
#[derive(Debug, Clone)]
struct Trigger {
    name: String,
    cadence: Cadence,
    action: Arc<dyn TriggerAction>,
    firings: Arc<AtomicU64>,
}

/// Periodic job producer
#[derive(Debug)]
pub struct Scheduler {
    /// Time source for calendar cadences
    clock: Arc<dyn Clock>,
    /// Registered triggers
    triggers: Vec<Trigger>,
}

impl Scheduler {
    /// Create a scheduler with no triggers
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            triggers: Vec::new(),
        }
    }

    /// Register a trigger. Cadences are validated when the scheduler starts.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        cadence: Cadence,
        action: Arc<dyn TriggerAction>,
    ) {
        let name = name.into();
        tracing::info!("Registered: {} ({})", name, cadence);
        self.triggers.push(Trigger {
            name,
            cadence,
            action,
            firings: Arc::new(AtomicU64::new(0)),
        });
    }

    /// Register the built-in maintenance and reporting triggers
    pub fn register_default_triggers(&mut self, submitter: JobSubmitter, store: Arc<dyn JobStore>) {
        let clock = Arc::clone(&self.clock);

        self.register(
            types::CLEANUP,
            Cadence::Every(Duration::from_secs(5 * 60)),
            Arc::new(SubmitJob::new(
                submitter.clone(),
                Arc::clone(&clock),
                types::CLEANUP,
                |_| "Remove completed jobs older than 7 days".to_string(),
            )),
        );
        self.register(
            types::HEALTH_REPORT,
            Cadence::Hourly,
            Arc::new(SubmitJob::new(
                submitter.clone(),
                Arc::clone(&clock),
                types::HEALTH_REPORT,
                |now| {
                    format!(
                        "Generate system health report at {}",
                        now.to_rfc3339_opts(SecondsFormat::Secs, true)
                    )
                },
            )),
        );
        self.register(
            types::DATA_AGGREGATION,
            Cadence::DailyAt { hour: 2, minute: 0 },
            Arc::new(SubmitJob::new(
                submitter,
                clock,
                types::DATA_AGGREGATION,
                |_| "Aggregate daily metrics and statistics".to_string(),
            )),
        );
        self.register(
            "batch-import-scan",
            Cadence::Every(Duration::from_secs(30)),
            Arc::new(BatchImportScan::new(store)),
        );
    }

    /// Names of registered triggers, in registration order
    pub fn trigger_names(&self) -> Vec<&str> {
        self.triggers.iter().map(|t| t.name.as_str()).collect()
    }

    /// How many times the named trigger has fired
    pub fn firings(&self, name: &str) -> u64 {
        self.triggers
            .iter()
            .find(|t| t.name == name)
            .map_or(0, |t| t.firings.load(Ordering::SeqCst))
    }

    /// Run all triggers until the cancel signal is received, then wait for
    /// in-flight firings to finish.
    ///
    /// Returns a configuration error without starting anything if any
    /// cadence is invalid.
    pub async fn run(&self, cancel: watch::Receiver<bool>) -> AppResult<()> {
        for trigger in &self.triggers {
            trigger.cadence.validate().map_err(|e| {
                AppError::configuration(format!("Trigger '{}': {}", trigger.name, e.message))
            })?;
        }

        tracing::info!("Scheduler started with {} triggers", self.triggers.len());

        let tracker = TaskTracker::new();
        let loops: Vec<_> = self
            .triggers
            .iter()
            .cloned()
            .map(|trigger| {
                tokio::spawn(trigger_loop(
                    trigger,
                    Arc::clone(&self.clock),
                    tracker.clone(),
                    cancel.clone(),
                ))
            })
            .collect();

        for handle in loops {
            if let Err(e) = handle.await {
                tracing::error!("Scheduler trigger task ended abnormally: {}", e);
            }
        }

        tracker.close();
        tracing::info!("Waiting for {} in-flight scheduled tasks", tracker.len());
        tracker.wait().await;

        tracing::info!("Scheduler shut down");
        Ok(())
    }
}

/// Next firing on tokio's timeline, plus the calendar time it stands for.
///
/// Calendar cadences never return a target at or before `last_target`, so
/// waking slightly early cannot fire the same boundary twice.
fn next_firing(
    cadence: Cadence,
    clock: &dyn Clock,
    previous: Instant,
    last_target: Option<DateTime<Local>>,
) -> (Instant, Option<DateTime<Local>>) {
    match cadence {
        Cadence::Every(period) => (previous + period, None),
        Cadence::Hourly | Cadence::DailyAt { .. } => {
            let now = clock.now_local();
            let from = last_target.map_or(now, |target| target.max(now));
            match cadence.next_after(from) {
                Some(next) => {
                    let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                    (Instant::now() + wait, Some(next))
                }
                None => (Instant::now() + Duration::from_secs(60), last_target),
            }
        }
    }
}

async fn trigger_loop(
    trigger: Trigger,
    clock: Arc<dyn Clock>,
    tracker: TaskTracker,
    mut cancel: watch::Receiver<bool>,
) {
    let (mut deadline, mut target) =
        next_firing(trigger.cadence, clock.as_ref(), Instant::now(), None);

    loop {
        tokio::select! {
            _ = cancel.wait_for(|stop| *stop) => break,
            _ = tokio::time::sleep_until(deadline) => {}
        }

        let firing = trigger.firings.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("Firing '{}' (#{})", trigger.name, firing);

        let action = Arc::clone(&trigger.action);
        let name = trigger.name.clone();
        tracker.spawn(async move {
            if let Err(e) = action.fire().await {
                tracing::error!("Scheduled task '{}' failed: {}", name, e);
            }
        });

        (deadline, target) = next_firing(trigger.cadence, clock.as_ref(), deadline, target);
    }
}
