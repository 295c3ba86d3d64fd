//! Metadata database operations for the filesystem backend.
//!
//! Handles saving, paging and removing object records in redb, and
//! reconciliation between the filesystem and the metadata database.

use anyhow::{Context, Result};
use redb::{Database, ReadableDatabase, ReadableTable};
use std::collections::HashSet;
use std::fs;
use std::ops::Bound;
use std::path::Path;

use super::types::{OBJECTS_TABLE, ObjectRecord};

pub(crate) const METADATA_DB_FILE: &str = "metadata.redb";

/// Creates the objects table if it does not exist yet.
pub(crate) fn init_table(db: &Database) -> Result<()> {
    let write_txn = db
        .begin_write()
        .context("Failed to begin initialization transaction")?;
    {
        let _table = write_txn
            .open_table(OBJECTS_TABLE)
            .context("Failed to initialize objects table")?;
    }
    write_txn
        .commit()
        .context("Failed to commit initialization transaction")?;
    Ok(())
}

/// Saves an object record.
pub(crate) fn save_record(db: &Database, key: &str, record: &ObjectRecord) -> Result<()> {
    let write_txn = db
        .begin_write()
        .context("Failed to begin write transaction")?;

    {
        let mut table = write_txn
            .open_table(OBJECTS_TABLE)
            .context("Failed to open objects table")?;

        let json = serde_json::to_vec(record).context("Failed to serialize object record")?;

        table
            .insert(key, json.as_slice())
            .with_context(|| format!("Failed to insert object record: {key}"))?;
    }

    write_txn
        .commit()
        .context("Failed to commit record save transaction")?;

    Ok(())
}

/// Removes an object record. Missing records are not an error.
pub(crate) fn remove_record(db: &Database, key: &str) -> Result<()> {
    let write_txn = db
        .begin_write()
        .context("Failed to begin write transaction")?;

    {
        let mut table = write_txn
            .open_table(OBJECTS_TABLE)
            .context("Failed to open objects table")?;

        table
            .remove(key)
            .with_context(|| format!("Failed to remove object record: {key}"))?;
    }

    write_txn
        .commit()
        .context("Failed to commit record removal transaction")?;

    Ok(())
}

/// Reads up to `limit + 1` records with keys strictly after `after`.
///
/// The extra record tells the caller whether another page exists.
/// Records that fail to deserialize come back with `None`.
pub(crate) fn page_records(
    db: &Database,
    after: Option<&str>,
    limit: usize,
) -> Result<Vec<(String, Option<ObjectRecord>)>> {
    let read_txn = db
        .begin_read()
        .context("Failed to begin read transaction")?;

    let table = read_txn
        .open_table(OBJECTS_TABLE)
        .context("Failed to open objects table")?;

    let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
    let range = table
        .range::<&str>((lower, Bound::Unbounded))
        .context("Failed to range over objects table")?;

    let mut records = Vec::new();
    for item in range.take(limit.saturating_add(1)) {
        let (key, value) = item.context("Failed to read object entry")?;
        let record = serde_json::from_slice::<ObjectRecord>(value.value()).ok();
        records.push((key.value().to_string(), record));
    }

    Ok(records)
}

/// Reconciles the metadata database with the files actually on disk.
///
/// - Records whose file is gone are removed.
/// - Files without a record get one with no user metadata, so the sweeper
///   leaves them alone.
pub(crate) fn reconcile(db: &Database, base_dir: &Path) -> Result<()> {
    tracing::debug!(base_dir = %base_dir.display(), "Reconciling storage metadata");

    let mut fs_files: HashSet<String> = HashSet::new();
    scan_directory(base_dir, base_dir, &mut fs_files)?;

    let mut orphaned: Vec<String> = Vec::new();
    {
        let read_txn = db
            .begin_read()
            .context("Failed to begin read transaction for reconciliation")?;
        let table = read_txn
            .open_table(OBJECTS_TABLE)
            .context("Failed to open objects table for reconciliation")?;

        for item in table.iter().context("Failed to iterate objects table")? {
            let (key, _) = item.context("Failed to read object entry")?;
            let key = key.value().to_string();
            if !fs_files.remove(&key) {
                orphaned.push(key);
            }
        }
    }

    for key in &orphaned {
        remove_record(db, key)?;
    }

    for key in &fs_files {
        let size = fs::metadata(base_dir.join(key)).map_or(0, |m| m.len());
        let record = ObjectRecord {
            content_type: "application/octet-stream".to_string(),
            size,
            metadata: None,
        };
        save_record(db, key, &record)?;
    }

    if orphaned.is_empty() && fs_files.is_empty() {
        tracing::debug!("Storage metadata is consistent with filesystem");
    } else {
        tracing::info!(
            orphaned = orphaned.len(),
            untracked = fs_files.len(),
            "Storage reconciliation complete"
        );
    }

    Ok(())
}

/// Recursively collects file paths relative to `base_dir`.
fn scan_directory(base_dir: &Path, dir: &Path, files: &mut HashSet<String>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path.file_name().is_some_and(|n| n == METADATA_DB_FILE) {
            continue;
        }
        if path.extension().is_some_and(|e| e == "lock") {
            continue;
        }

        if path.is_dir() {
            scan_directory(base_dir, &path, files)?;
        } else if path.is_file()
            && let Ok(relative) = path.strip_prefix(base_dir)
        {
            files.insert(relative.to_string_lossy().replace('\\', "/"));
        }
    }

    Ok(())
}
