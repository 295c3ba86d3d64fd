//! Backend trait for the object store.
//!
//! Defines the three capabilities the entry points rely on, enabling
//! pluggable storage (memory, filesystem, S3-compatible).

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use super::types::{ListPage, PutOptions};

/// Backend trait for object storage.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
///
/// # Example
///
/// ```ignore
/// use pixgate::storage::{MemoryStore, ObjectStore, PutOptions};
///
/// let store = MemoryStore::new();
/// store.put("images/1-abcdef.png", image_bytes, PutOptions::new("image/png")).await?;
/// let page = store.list(None).await?;
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Stores an object together with its content type and metadata.
    ///
    /// Bytes and metadata are written as one unit; an existing object under
    /// the same key is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()>;

    /// Lists one page of objects in key order, starting after `cursor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing request fails.
    async fn list(&self, cursor: Option<&str>) -> Result<ListPage>;

    /// Deletes an object. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the deletion fails.
    async fn delete(&self, key: &str) -> Result<()>;
}
