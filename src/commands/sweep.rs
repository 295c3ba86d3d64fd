//! Run one retention pass and exit.
//!
//! Meant for external schedulers (cron, systemd timers, Kubernetes
//! CronJobs) when `serve --no-sweep` is used.

use anyhow::Result;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::storage::open_store;
use crate::sweeper::{RetentionSweeper, SweepReport};

/// Sweep the configured store once.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, a list call fails, or any
/// expired object could not be deleted.
pub async fn execute(config: &Config) -> Result<()> {
    let store = open_store(&config.storage).await?;
    let sweeper = RetentionSweeper::new(store, Arc::new(SystemClock), config.retention_config());

    let report = sweeper.run().await?;
    print_report(&report);

    if !report.failed.is_empty() {
        anyhow::bail!(
            "{} expired object(s) could not be deleted",
            report.failed.len()
        );
    }
    Ok(())
}

fn print_report(report: &SweepReport) {
    println!("Retention sweep complete");
    println!("  Cutoff:  {}", format_millis(report.cutoff));
    println!("  Pages:   {}", report.pages);
    println!("  Scanned: {}", report.scanned);
    println!("  Deleted: {}", report.deleted.len());
    if report.skipped > 0 {
        println!("  Skipped: {} (no createdAt)", report.skipped);
    }
    for key in &report.failed {
        println!("  Failed:  {key}");
    }
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map_or_else(|| millis.to_string(), |dt| dt.to_rfc3339())
}
