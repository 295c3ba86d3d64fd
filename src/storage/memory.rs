//! In-memory storage backend.
//!
//! Provides a fast, non-persistent object store using DashMap for
//! concurrent access. Used by tests and by `backend = "memory"`.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;

use super::backend::ObjectStore;
use super::types::{ListPage, ListedObject, Metadata, PutOptions};
use super::validation::validate_key;
use crate::constants::DEFAULT_PAGE_SIZE;

/// Entry stored in the memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub data: Bytes,
    pub content_type: String,
    pub metadata: Option<Metadata>,
}

/// In-memory object store.
///
/// Listing walks keys in lexicographic order; the cursor is the last key of
/// the previous page, so deleting already-listed keys never shifts later
/// pages.
///
/// `MemoryStore` is `Clone`; clones share the same objects.
#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<DashMap<String, MemoryObject>>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets how many objects a single `list` call returns (minimum 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Inserts an object directly, bypassing key validation.
    ///
    /// Lets tests seed objects with arbitrary or missing metadata.
    pub fn insert_raw(&self, key: &str, data: impl Into<Bytes>, metadata: Option<Metadata>) {
        self.data.insert(
            key.to_string(),
            MemoryObject {
                data: data.into(),
                content_type: "application/octet-stream".to_string(),
                metadata,
            },
        );
    }

    /// Returns a copy of the object stored under `key`.
    pub fn get(&self, key: &str) -> Option<MemoryObject> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// All keys in listing order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        let key = validate_key(key)?;
        self.data.insert(
            key,
            MemoryObject {
                data,
                content_type: options.content_type,
                metadata: Some(options.metadata),
            },
        );
        Ok(())
    }

    async fn list(&self, cursor: Option<&str>) -> Result<ListPage> {
        let mut remaining: Vec<(String, Option<Metadata>)> = self
            .data
            .iter()
            .filter(|entry| cursor.is_none_or(|cursor| entry.key().as_str() > cursor))
            .map(|entry| (entry.key().clone(), entry.value().metadata.clone()))
            .collect();
        remaining.sort_by(|a, b| a.0.cmp(&b.0));

        let has_more = remaining.len() > self.page_size;
        remaining.truncate(self.page_size);

        let cursor = if has_more {
            remaining.last().map(|(key, _)| key.clone())
        } else {
            None
        };

        Ok(ListPage {
            objects: remaining
                .into_iter()
                .map(|(key, metadata)| ListedObject { key, metadata })
                .collect(),
            cursor,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        self.data.remove(&key);
        Ok(())
    }
}
