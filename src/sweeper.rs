//! Retention sweeper.
//!
//! One pass walks the whole store page by page and deletes every object
//! whose `createdAt` metadata is strictly older than `now - max_age`.
//!
//! - The cutoff is computed once, before the first page.
//! - Objects without metadata, or with a missing or non-numeric `createdAt`,
//!   are never deleted.
//! - A failed delete is logged and counted; the pass continues.
//! - A failed list ends the pass with an error.
//!
//! Deletion is idempotent, so overlapping passes and objects created during
//! a pass are harmless: a new object is always younger than the cutoff.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::asset::created_at_from;
use crate::clock::Clock;
use crate::constants::MILLIS_PER_DAY;
use crate::storage::ObjectStore;

/// Settings the sweeper needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    /// Objects at least this old are deleted.
    pub max_age: Duration,
}

impl RetentionConfig {
    pub fn days(days: u64) -> Self {
        Self {
            max_age: Duration::from_millis(days.saturating_mul(MILLIS_PER_DAY)),
        }
    }

    fn max_age_millis(&self) -> i64 {
        i64::try_from(self.max_age.as_millis()).unwrap_or(i64::MAX)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self::days(crate::constants::DEFAULT_RETENTION_DAYS)
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Cutoff used for the pass, epoch milliseconds
    pub cutoff: i64,
    pub pages: usize,
    pub scanned: usize,
    /// Keys deleted, in listing order
    pub deleted: Vec<String>,
    /// Objects whose age could not be determined
    pub skipped: usize,
    /// Keys whose deletion failed
    pub failed: Vec<String>,
}

/// Deletes expired assets from an object store.
#[derive(Clone)]
pub struct RetentionSweeper {
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    config: RetentionConfig,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn ObjectStore>, clock: Arc<dyn Clock>, config: RetentionConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> RetentionConfig {
        self.config
    }

    /// Runs one full pass over the store.
    ///
    /// # Errors
    ///
    /// Returns an error if a `list` call fails. Objects deleted before the
    /// failure stay deleted.
    pub async fn run(&self) -> Result<SweepReport> {
        let cutoff = self
            .clock
            .now_millis()
            .saturating_sub(self.config.max_age_millis());
        let mut report = SweepReport {
            cutoff,
            ..SweepReport::default()
        };

        info!(cutoff, "Starting retention sweep");

        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .store
                .list(cursor.as_deref())
                .await
                .with_context(|| format!("Failed to list objects (page {})", report.pages + 1))?;
            report.pages += 1;

            for object in &page.objects {
                report.scanned += 1;

                let created_at = object.metadata.as_ref().and_then(created_at_from);
                let Some(created_at) = created_at else {
                    debug!(key = %object.key, "Skipping object without creation time");
                    report.skipped += 1;
                    continue;
                };
                if created_at >= cutoff {
                    continue;
                }

                info!(key = %object.key, created_at, "Deleting expired image");
                match self.store.delete(&object.key).await {
                    Ok(()) => report.deleted.push(object.key.clone()),
                    Err(e) => {
                        warn!(key = %object.key, error = %format!("{e:#}"), "Failed to delete expired image");
                        report.failed.push(object.key.clone());
                    },
                }
            }

            match page.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        info!(
            pages = report.pages,
            scanned = report.scanned,
            deleted = report.deleted.len(),
            skipped = report.skipped,
            failed = report.failed.len(),
            "Retention sweep complete"
        );

        Ok(report)
    }
}
