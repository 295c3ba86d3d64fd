//! Cron-driven retention sweeps for `pixgate serve`.
//!
//! Schedules use the six-field cron syntax with a leading seconds field,
//! e.g. `0 0 0 * * *` for daily at midnight UTC.

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::sweeper::RetentionSweeper;

/// Running scheduler owning the sweep job.
pub struct SweepScheduler {
    scheduler: JobScheduler,
    schedule: String,
}

impl SweepScheduler {
    /// Registers the sweep job and starts the scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if `schedule` is not a valid cron expression or the
    /// scheduler cannot start.
    pub async fn start(sweeper: RetentionSweeper, schedule: &str) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;

        let job = Job::new_async(schedule, move |_id, _scheduler| {
            let sweeper = sweeper.clone();
            Box::pin(async move {
                if let Err(e) = sweeper.run().await {
                    error!(error = %format!("{e:#}"), "Scheduled retention sweep failed");
                }
            })
        })
        .with_context(|| format!("Invalid sweep schedule '{schedule}'"))?;

        scheduler
            .add(job)
            .await
            .context("Failed to register sweep job")?;
        scheduler
            .start()
            .await
            .context("Failed to start job scheduler")?;

        info!(%schedule, "Retention sweep scheduled");

        Ok(Self {
            scheduler,
            schedule: schedule.to_string(),
        })
    }

    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Stops the scheduler. A sweep already in progress is not awaited.
    pub async fn shutdown(mut self) -> Result<()> {
        self.scheduler
            .shutdown()
            .await
            .context("Failed to stop job scheduler")
    }
}
