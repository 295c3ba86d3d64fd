//! Types shared by the object store backends.

use std::collections::BTreeMap;

use redb::TableDefinition;
use serde::{Deserialize, Serialize};

/// Table holding one JSON [`ObjectRecord`] per key (filesystem backend).
pub(crate) const OBJECTS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("objects");

/// User metadata attached to an object. Values are strings, as in S3/R2.
pub type Metadata = BTreeMap<String, String>;

/// Options applied to a `put`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// MIME content type (e.g., "image/png")
    pub content_type: String,
    /// User metadata stored with the object
    pub metadata: Metadata,
}

impl PutOptions {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One entry of a list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedObject {
    pub key: String,
    /// `None` when the store has no user metadata for the object.
    pub metadata: Option<Metadata>,
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<ListedObject>,
    /// Opaque token for the next page; `None` on the last page.
    pub cursor: Option<String>,
}

impl ListPage {
    /// Cursor to continue with, treating an empty token as end of listing.
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|cursor| !cursor.is_empty())
    }
}

/// Per-object record persisted by the filesystem backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct ObjectRecord {
    pub content_type: String,
    pub size: u64,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}
