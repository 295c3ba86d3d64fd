//! Object store collaborator.
//!
//! The entry points only use [`ObjectStore`]'s three operations: `put`,
//! cursor-paginated `list` and `delete`. Backends:
//!
//! - [`MemoryStore`] - non-persistent, for tests and local runs
//! - [`FilesystemStore`] - files on disk with records in redb
//! - `S3Store` - any S3-compatible service (feature `s3`)
//!
//! Keys are validated by every backend: empty keys, absolute paths and
//! `..` components are rejected.

mod backend;
mod filesystem;
mod memory;
mod metadata;
#[cfg(feature = "s3")]
mod s3;
mod types;
mod validation;

use anyhow::{Context, Result};
use std::sync::Arc;

pub use backend::ObjectStore;
pub use filesystem::FilesystemStore;
pub use memory::{MemoryObject, MemoryStore};
#[cfg(feature = "s3")]
pub use s3::{S3Settings, S3Store};
pub use types::{ListPage, ListedObject, Metadata, PutOptions};

use crate::config::{StorageBackendKind, StorageConfig};

/// Opens the backend selected by `[storage]`.
///
/// # Errors
///
/// Returns an error if the filesystem store cannot be opened, if the S3
/// bucket is missing, or if `s3` is selected in a build without the feature.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackendKind::Memory => Ok(Arc::new(
            MemoryStore::new().with_page_size(config.page_size),
        )),
        StorageBackendKind::Filesystem => {
            let store = FilesystemStore::open(&config.path)
                .with_context(|| {
                    format!("Failed to open filesystem store at {}", config.path.display())
                })?
                .with_page_size(config.page_size);
            Ok(Arc::new(store))
        },
        StorageBackendKind::S3 => open_s3(config).await,
    }
}

#[cfg(feature = "s3")]
async fn open_s3(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let bucket = config
        .bucket
        .clone()
        .filter(|bucket| !bucket.is_empty())
        .context("storage.bucket is required for the s3 backend")?;

    let store = S3Store::connect(S3Settings {
        bucket,
        region: config.region.clone(),
        endpoint: config.endpoint.clone(),
        force_path_style: config.force_path_style,
        page_size: i32::try_from(config.page_size).unwrap_or(i32::MAX),
    })
    .await;

    Ok(Arc::new(store))
}

#[cfg(not(feature = "s3"))]
async fn open_s3(_config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    anyhow::bail!("storage.backend = \"s3\" requires building with the `s3` feature")
}
