//! Document stores - The consumed storage contract.
//!
//! [`DocumentStore`] is the seam between the mapping layer and whatever
//! actually holds the documents: equality-filtered queries, identifier
//! addressed reads and writes with a merge flag, atomic multi-document
//! batches, and collection change feeds. Implementations own all transport,
//! timeout, and retry policy; this layer imposes none.
//!
//! The crate ships [`InMemoryDocumentStore`] as the reference
//! implementation for tests, development, and single-process use.

mod error;
mod in_memory;

use std::time::Duration;

use crate::document::{FieldMap, Filter, StoredDocument};

pub use error::StoreError;
pub use in_memory::{InMemoryChangeFeed, InMemoryDocumentStore};

/// A single write queued into a [`WriteBatch`].
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Write a document at a known identifier. With `merge` set, fields
    /// absent from the payload are preserved; without it the payload
    /// replaces the document wholesale. Creates the document when absent.
    Set {
        collection: String,
        id: String,
        fields: FieldMap,
        merge: bool,
    },
    /// Merge fields into an existing document. Unlike `Set`, the document
    /// must already exist; a missing target fails the whole batch.
    Update {
        collection: String,
        id: String,
        fields: FieldMap,
    },
    /// Insert a new document with a store-assigned identifier.
    Add {
        collection: String,
        fields: FieldMap,
    },
}

/// A list of writes committed all-or-nothing.
///
/// Either every queued write becomes visible or none does; readers never
/// observe a partially applied batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an identifier-addressed write.
    pub fn set(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: FieldMap,
        merge: bool,
    ) -> Self {
        self.ops.push(WriteOp::Set {
            collection: collection.into(),
            id: id.into(),
            fields,
            merge,
        });
        self
    }

    /// Queue a merge into an existing document.
    pub fn update(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: FieldMap,
    ) -> Self {
        self.ops.push(WriteOp::Update {
            collection: collection.into(),
            id: id.into(),
            fields,
        });
        self
    }

    /// Queue an insert with a store-assigned identifier.
    pub fn add(mut self, collection: impl Into<String>, fields: FieldMap) -> Self {
        self.ops.push(WriteOp::Add {
            collection: collection.into(),
            fields,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// A notification delivered by a collection change feed.
#[derive(Clone, Debug, PartialEq)]
pub enum FeedEvent {
    /// The full current snapshot of the watched collection, in
    /// store-defined order.
    Snapshot(Vec<StoredDocument>),
    /// The feed's transport failed for this notification. The feed itself
    /// stays open; subsequent notifications may still arrive.
    TransportError(String),
}

/// A pull-based collection change feed.
///
/// Obtained from [`DocumentStore::watch`]. Dropping the feed releases the
/// store-side registration.
pub trait ChangeFeed: Send {
    /// Wait for the next notification, up to `timeout`.
    ///
    /// `Ok(None)` means the timeout elapsed with nothing to deliver; keep
    /// polling. `Err` means the feed is closed for good.
    fn poll(&self, timeout: Duration) -> Result<Option<FeedEvent>, StoreError>;
}

/// Abstract document storage: collections of field-maps addressed by a
/// store-assigned primary identifier.
pub trait DocumentStore: Send + Sync {
    /// The change feed type produced by [`watch`](Self::watch).
    type Feed: ChangeFeed + 'static;

    /// Fetch a single document by identifier. Returns `None` when absent.
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<FieldMap>, StoreError>;

    /// All documents matching the filter, in store-defined order.
    fn query_documents(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Insert a new document; the store assigns and returns its identifier.
    fn add_document(&self, collection: &str, fields: FieldMap) -> Result<String, StoreError>;

    /// Write a document at a known identifier, merging or replacing per the
    /// flag. Creates the document when absent.
    fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: FieldMap,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Delete a document by identifier. Deleting an absent document
    /// succeeds.
    fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Apply a batch of writes atomically: all visible or none.
    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Subscribe to a collection's change feed. Each call yields an
    /// independent feed with its own delivery channel.
    fn watch(&self, collection: &str) -> Result<Self::Feed, StoreError>;
}
