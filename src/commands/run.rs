//! Run the consumer loop and the scheduler until a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::sync::watch;

use jobhub_core::config::AppConfig;
use jobhub_core::error::AppError;
use jobhub_core::traits::{Clock, SystemClock};
use jobhub_database::JobStore;
use jobhub_worker::{JobExecutor, JobSubmitter, Scheduler, WorkerRunner};

/// Arguments for the run command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Do not start the queue consumer
    #[arg(long)]
    pub no_worker: bool,
    /// Do not start the scheduler
    #[arg(long)]
    pub no_scheduler: bool,
    /// Skip migrations at startup
    #[arg(long)]
    pub skip_migrations: bool,
}

/// Grace period for background tasks after the shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Start the worker and scheduler
pub async fn execute(args: &RunArgs, config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting JobHub v{}", env!("CARGO_PKG_VERSION"));

    let pool = jobhub_database::DatabasePool::connect(&config.database).await?;
    if !args.skip_migrations {
        jobhub_database::migration::run_migrations(pool.pool()).await?;
    }

    let store: Arc<dyn JobStore> = Arc::new(jobhub_database::PgJobRepository::new(
        pool.pool().clone(),
    ));
    let queue = super::create_queue(&config).await?.provider();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = if config.worker.enabled && !args.no_worker {
        let executor = Arc::new(JobExecutor::with_default_handlers(
            Arc::clone(&store),
            Arc::clone(&clock),
        ));
        let runner = WorkerRunner::new(
            Arc::clone(&queue),
            Arc::clone(&store),
            executor,
            Arc::clone(&clock),
            config.worker.clone(),
        );

        let worker_cancel = shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            runner.run(worker_cancel).await;
        });

        tracing::info!("Queue consumer started");
        Some(handle)
    } else {
        tracing::info!("Queue consumer disabled");
        None
    };

    let mut scheduler_handle = if config.scheduler.enabled && !args.no_scheduler {
        let submitter =
            JobSubmitter::new(Arc::clone(&store), Arc::clone(&queue), Arc::clone(&clock));
        let mut scheduler = Scheduler::new(Arc::clone(&clock));
        scheduler.register_default_triggers(submitter, Arc::clone(&store));

        let scheduler_cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            scheduler.run(scheduler_cancel).await
        }))
    } else {
        tracing::info!("Scheduler disabled");
        None
    };

    // An invalid trigger ends the scheduler immediately; that stops everything.
    let early_exit = tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
            None
        }
        result = async {
            match scheduler_handle.as_mut() {
                Some(handle) => handle.await,
                None => std::future::pending().await,
            }
        } => Some(result),
    };
    let _ = shutdown_tx.send(true);

    if let Some(handle) = worker_handle {
        if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
            tracing::warn!("Queue consumer did not stop within {:?}", SHUTDOWN_GRACE);
        }
    }

    let scheduler_result = match (early_exit, scheduler_handle) {
        (Some(result), _) => Some(result),
        (None, Some(handle)) => match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
            Ok(result) => Some(result),
            Err(_) => {
                tracing::warn!("Scheduler did not stop within {:?}", SHUTDOWN_GRACE);
                None
            }
        },
        (None, None) => None,
    };

    pool.close().await;
    tracing::info!("JobHub shut down");

    match scheduler_result {
        Some(Ok(result)) => result,
        Some(Err(e)) => Err(AppError::internal(format!("Scheduler task panicked: {e}"))),
        None => Ok(()),
    }
}

/// Resolve on Ctrl+C or SIGTERM. A handler that cannot be installed is
/// logged and never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
