//! Scheduler service for running reconciliation passes in the background.
//!
//! Runs one pass at startup (when enabled) and then a pass on a fixed
//! interval. Overlapping passes are skipped by the engine's run-lock.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::config::SyncConfig;
use crate::error::{AppError, Result};
use crate::services::sync::{SyncEngine, SyncReport};

/// Job execution context providing access to application services.
#[derive(Clone)]
pub struct JobContext {
    pub engine: Arc<SyncEngine>,
}

/// The scheduler service managing the sync jobs.
pub struct Scheduler {
    scheduler: JobScheduler,
    ctx: JobContext,
    run_on_startup: bool,
}

impl Scheduler {
    /// Create a new scheduler wrapped in Arc for shared access.
    pub async fn new_shared(config: &SyncConfig, ctx: JobContext) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(config, ctx).await?))
    }

    /// Create a new scheduler with the recurring sync job registered.
    pub async fn new(config: &SyncConfig, ctx: JobContext) -> Result<Self> {
        if config.interval_secs == 0 {
            return Err(AppError::BadRequest(
                "Sync interval must be greater than zero".to_string(),
            ));
        }

        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create scheduler: {}", e)))?;

        Self::add_incremental_sync_job(
            &scheduler,
            Duration::from_secs(config.interval_secs),
            ctx.clone(),
        )
        .await?;

        Ok(Self {
            scheduler,
            ctx,
            run_on_startup: config.run_on_startup,
        })
    }

    /// Start the scheduler, spawning the startup pass first when enabled.
    pub async fn start(&self) -> Result<()> {
        if self.run_on_startup {
            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                run_full_sync_job(&ctx).await;
            });
        }

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start scheduler: {}", e)))
    }

    /// Shutdown the scheduler gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        // JobScheduler is a cheap handle over shared state
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to shutdown scheduler: {}", e)))
    }

    /// Add the recurring sync job.
    async fn add_incremental_sync_job(
        scheduler: &JobScheduler,
        interval: Duration,
        ctx: JobContext,
    ) -> Result<()> {
        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let ctx = ctx.clone();
            Box::pin(async move {
                run_incremental_sync_job(&ctx).await;
            })
        })
        .map_err(map_scheduler_error)?;

        scheduler.add(job).await.map_err(map_scheduler_error)?;
        tracing::debug!(interval_secs = interval.as_secs(), "Scheduled incremental_sync job");
        Ok(())
    }
}

/// Map JobSchedulerError to AppError.
fn map_scheduler_error(e: JobSchedulerError) -> AppError {
    AppError::Internal(format!("Scheduler error: {}", e))
}

// ============================================================================
// Job Implementations
// ============================================================================

/// Startup pass.
pub async fn run_full_sync_job(ctx: &JobContext) {
    tracing::info!("Running full_sync job");
    log_outcome("full_sync", ctx.engine.run_full_sync().await.as_ref());
}

/// Recurring pass.
pub async fn run_incremental_sync_job(ctx: &JobContext) {
    tracing::debug!("Running incremental_sync job");
    log_outcome(
        "incremental_sync",
        ctx.engine.run_incremental_sync().await.as_ref(),
    );
}

fn log_outcome(job: &str, report: Option<&SyncReport>) {
    match report {
        Some(report) if report.succeeded() => {
            tracing::debug!(job, duration_ms = report.duration_ms, "Sync job completed");
        }
        Some(report) => {
            tracing::warn!(job, error = ?report.error, "Sync job completed with errors");
        }
        None => tracing::debug!(job, "Sync job skipped, pass already running"),
    }
}
