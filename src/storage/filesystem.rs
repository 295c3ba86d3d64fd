//! Filesystem-backed storage backend.
//!
//! Provides persistent object storage using the local filesystem with
//! per-object records (content type, size, user metadata) tracked in redb.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use redb::Database;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::backend::ObjectStore;
use super::metadata::{
    METADATA_DB_FILE, init_table, page_records, reconcile, remove_record, save_record,
};
use super::types::{ListPage, ListedObject, ObjectRecord, PutOptions};
use super::validation::{object_path, validate_key};
use crate::constants::DEFAULT_PAGE_SIZE;

/// Filesystem-backed object store.
///
/// `FilesystemStore` is `Clone` and can be shared across threads. The
/// underlying database handles concurrent access safely.
#[derive(Clone)]
pub struct FilesystemStore {
    base_dir: PathBuf,
    db: Arc<Database>,
    page_size: usize,
}

impl FilesystemStore {
    /// Creates or opens the store at the given base directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Storage directory cannot be created
    /// - Metadata database cannot be opened or initialized
    /// - Metadata reconciliation fails
    pub fn open<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        fs::create_dir_all(&base_dir).with_context(|| {
            format!("Failed to create storage directory: {}", base_dir.display())
        })?;

        let db_path = base_dir.join(METADATA_DB_FILE);
        let db = Database::create(&db_path).with_context(|| {
            format!(
                "Failed to open storage metadata database: {}",
                db_path.display()
            )
        })?;
        init_table(&db)?;
        reconcile(&db, &base_dir)?;

        Ok(Self {
            base_dir,
            db: Arc::new(db),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Sets how many objects a single `list` call returns (minimum 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn put_sync(&self, key: &str, data: &[u8], options: PutOptions) -> Result<()> {
        let key = validate_key(key)?;
        let file_path = self.base_dir.join(&key);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create parent directories for: {key}"))?;
        }

        fs::write(&file_path, data).with_context(|| format!("Failed to write object: {key}"))?;

        let record = ObjectRecord {
            content_type: options.content_type,
            size: data.len() as u64,
            metadata: Some(options.metadata),
        };
        save_record(&self.db, &key, &record)
    }

    fn list_sync(&self, cursor: Option<&str>) -> Result<ListPage> {
        let mut records = page_records(&self.db, cursor, self.page_size)?;

        let has_more = records.len() > self.page_size;
        records.truncate(self.page_size);

        let cursor = if has_more {
            records.last().map(|(key, _)| key.clone())
        } else {
            None
        };

        Ok(ListPage {
            objects: records
                .into_iter()
                .map(|(key, record)| ListedObject {
                    key,
                    metadata: record.and_then(|r| r.metadata),
                })
                .collect(),
            cursor,
        })
    }

    fn delete_sync(&self, key: &str) -> Result<()> {
        let file_path = object_path(&self.base_dir, key)?;

        match fs::remove_file(&file_path) {
            Ok(()) => {},
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to delete object: {key}"));
            },
        }

        remove_record(&self.db, &validate_key(key)?)
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.put_sync(&key, &data, options))
            .await
            .context("Task join error")?
    }

    async fn list(&self, cursor: Option<&str>) -> Result<ListPage> {
        let store = self.clone();
        let cursor = cursor.map(std::string::ToString::to_string);
        tokio::task::spawn_blocking(move || store.list_sync(cursor.as_deref()))
            .await
            .context("Task join error")?
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.delete_sync(&key))
            .await
            .context("Task join error")?
    }
}
