//! InMemoryDocumentStore - HashMap-backed document store for testing and
//! development.
//!
//! Collections are ordered by document identifier, and identifiers are
//! assigned from a zero-padded counter, so "store-defined order" is
//! insertion order and deterministic in tests. Clone-friendly via Arc.

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::document::{FieldMap, Filter, StoredDocument};

use super::{ChangeFeed, DocumentStore, FeedEvent, StoreError, WriteBatch, WriteOp};

type Collection = BTreeMap<String, FieldMap>;

struct Inner {
    collections: HashMap<String, Collection>,
    next_id: u64,
}

struct Watcher {
    collection: String,
    sender: Sender<FeedEvent>,
}

/// In-memory document store backed by per-collection maps.
///
/// ## Example
///
/// ```
/// use documap::{DocumentStore, FieldMap, InMemoryDocumentStore};
///
/// let store = InMemoryDocumentStore::new();
/// let mut fields = FieldMap::new();
/// fields.insert("name".into(), "a".into());
///
/// let id = store.add_document("things", fields).unwrap();
/// assert!(store.get_document("things", &id).unwrap().is_some());
/// ```
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<Inner>>,
    watchers: Arc<Mutex<Vec<Watcher>>>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                collections: HashMap::new(),
                next_id: 1,
            })),
            watchers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Insert a document verbatim, bypassing any mapping (useful for
    /// seeding malformed documents in tests).
    pub fn insert_raw(
        &self,
        collection: &str,
        id: &str,
        fields: FieldMap,
    ) -> Result<(), StoreError> {
        let snapshot = {
            let mut inner = self
                .inner
                .write()
                .map_err(|_| StoreError::LockPoisoned("insert_raw"))?;
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), fields);
            snapshot_of(&inner, collection)
        };
        self.notify(collection, snapshot)
    }

    /// Read a document's raw fields (test support).
    pub fn document(&self, collection: &str, id: &str) -> Option<FieldMap> {
        let inner = self.inner.read().ok()?;
        inner.collections.get(collection)?.get(id).cloned()
    }

    /// Number of documents in a collection (test support).
    pub fn collection_len(&self, collection: &str) -> usize {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.collections.get(collection).map(|c| c.len()))
            .unwrap_or(0)
    }

    /// Deliver a transport error to every watcher of a collection
    /// (test support for the lenient live-update path).
    pub fn emit_transport_error(
        &self,
        collection: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        let mut watchers = self
            .watchers
            .lock()
            .map_err(|_| StoreError::LockPoisoned("emit_transport_error"))?;
        watchers.retain(|w| {
            w.collection != collection
                || w.sender
                    .send(FeedEvent::TransportError(message.to_string()))
                    .is_ok()
        });
        Ok(())
    }

    fn notify(&self, collection: &str, snapshot: Vec<StoredDocument>) -> Result<(), StoreError> {
        let mut watchers = self
            .watchers
            .lock()
            .map_err(|_| StoreError::LockPoisoned("notify"))?;
        // Watchers whose feed was dropped are pruned here.
        watchers.retain(|w| {
            w.collection != collection
                || w.sender.send(FeedEvent::Snapshot(snapshot.clone())).is_ok()
        });
        Ok(())
    }

    fn apply(inner: &mut Inner, op: WriteOp) {
        match op {
            WriteOp::Set {
                collection,
                id,
                fields,
                merge,
            } => {
                let docs = inner.collections.entry(collection).or_default();
                if merge {
                    let doc = docs.entry(id).or_default();
                    for (field, value) in fields {
                        doc.insert(field, value);
                    }
                } else {
                    docs.insert(id, fields);
                }
            }
            WriteOp::Update {
                collection,
                id,
                fields,
            } => {
                // Existence was validated before apply.
                if let Some(doc) = inner
                    .collections
                    .entry(collection)
                    .or_default()
                    .get_mut(&id)
                {
                    for (field, value) in fields {
                        doc.insert(field, value);
                    }
                }
            }
            WriteOp::Add { collection, fields } => {
                let id = next_document_id(inner);
                inner
                    .collections
                    .entry(collection)
                    .or_default()
                    .insert(id, fields);
            }
        }
    }
}

fn next_document_id(inner: &mut Inner) -> String {
    let id = format!("doc-{:06}", inner.next_id);
    inner.next_id += 1;
    id
}

fn snapshot_of(inner: &Inner, collection: &str) -> Vec<StoredDocument> {
    inner
        .collections
        .get(collection)
        .map(|docs| {
            docs.iter()
                .map(|(id, fields)| StoredDocument::new(id.clone(), fields.clone()))
                .collect()
        })
        .unwrap_or_default()
}

impl DocumentStore for InMemoryDocumentStore {
    type Feed = InMemoryChangeFeed;

    fn get_document(&self, collection: &str, id: &str) -> Result<Option<FieldMap>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::LockPoisoned("get_document"))?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn query_documents(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::LockPoisoned("query_documents"))?;
        let mut results = Vec::new();
        if let Some(docs) = inner.collections.get(collection) {
            for (id, fields) in docs {
                if filter.matches(fields) {
                    results.push(StoredDocument::new(id.clone(), fields.clone()));
                }
            }
        }
        Ok(results)
    }

    fn add_document(&self, collection: &str, fields: FieldMap) -> Result<String, StoreError> {
        let (id, snapshot) = {
            let mut inner = self
                .inner
                .write()
                .map_err(|_| StoreError::LockPoisoned("add_document"))?;
            let id = next_document_id(&mut inner);
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), fields);
            (id, snapshot_of(&inner, collection))
        };
        self.notify(collection, snapshot)?;
        Ok(id)
    }

    fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: FieldMap,
        merge: bool,
    ) -> Result<(), StoreError> {
        let snapshot = {
            let mut inner = self
                .inner
                .write()
                .map_err(|_| StoreError::LockPoisoned("set_document"))?;
            Self::apply(
                &mut inner,
                WriteOp::Set {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    fields,
                    merge,
                },
            );
            snapshot_of(&inner, collection)
        };
        self.notify(collection, snapshot)
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let snapshot = {
            let mut inner = self
                .inner
                .write()
                .map_err(|_| StoreError::LockPoisoned("delete_document"))?;
            let removed = inner
                .collections
                .get_mut(collection)
                .and_then(|docs| docs.remove(id))
                .is_some();
            if !removed {
                // Idempotent by identifier: absence is success, no change
                // notification.
                return Ok(());
            }
            snapshot_of(&inner, collection)
        };
        self.notify(collection, snapshot)
    }

    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let snapshots = {
            let mut inner = self
                .inner
                .write()
                .map_err(|_| StoreError::LockPoisoned("commit_batch"))?;

            // Validate the whole batch against the pre-batch state before
            // touching anything: all or nothing.
            for op in batch.ops() {
                if let WriteOp::Update { collection, id, .. } = op {
                    let exists = inner
                        .collections
                        .get(collection)
                        .map(|docs| docs.contains_key(id))
                        .unwrap_or(false);
                    if !exists {
                        return Err(StoreError::Storage(format!(
                            "batch update targets missing document {}:{}",
                            collection, id
                        )));
                    }
                }
            }

            let mut affected: Vec<String> = Vec::new();
            for op in batch.into_ops() {
                let collection = match &op {
                    WriteOp::Set { collection, .. }
                    | WriteOp::Update { collection, .. }
                    | WriteOp::Add { collection, .. } => collection.clone(),
                };
                if !affected.contains(&collection) {
                    affected.push(collection);
                }
                Self::apply(&mut inner, op);
            }

            affected
                .into_iter()
                .map(|collection| {
                    let snapshot = snapshot_of(&inner, &collection);
                    (collection, snapshot)
                })
                .collect::<Vec<_>>()
        };

        for (collection, snapshot) in snapshots {
            self.notify(&collection, snapshot)?;
        }
        Ok(())
    }

    fn watch(&self, collection: &str) -> Result<Self::Feed, StoreError> {
        let (sender, receiver) = mpsc::channel();

        // The current snapshot is delivered immediately, before any change.
        let snapshot = {
            let inner = self
                .inner
                .read()
                .map_err(|_| StoreError::LockPoisoned("watch"))?;
            snapshot_of(&inner, collection)
        };
        let _ = sender.send(FeedEvent::Snapshot(snapshot));

        let mut watchers = self
            .watchers
            .lock()
            .map_err(|_| StoreError::LockPoisoned("watch"))?;
        watchers.push(Watcher {
            collection: collection.to_string(),
            sender,
        });

        Ok(InMemoryChangeFeed { receiver })
    }
}

/// Change feed handle for [`InMemoryDocumentStore`].
///
/// Dropping the feed releases the watcher; the store prunes it on the next
/// notification.
pub struct InMemoryChangeFeed {
    receiver: Receiver<FeedEvent>,
}

impl ChangeFeed for InMemoryChangeFeed {
    fn poll(&self, timeout: Duration) -> Result<Option<FeedEvent>, StoreError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(StoreError::Transport("change feed closed".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> FieldMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let store = InMemoryDocumentStore::new();
        let first = store.add_document("c", fields(json!({"n": 1}))).unwrap();
        let second = store.add_document("c", fields(json!({"n": 2}))).unwrap();

        assert_ne!(first, second);
        assert!(first < second);
    }

    #[test]
    fn set_with_merge_preserves_other_fields() {
        let store = InMemoryDocumentStore::new();
        store
            .set_document("c", "1", fields(json!({"name": "a", "age": 5})), true)
            .unwrap();
        store
            .set_document("c", "1", fields(json!({"name": "b"})), true)
            .unwrap();

        let doc = store.document("c", "1").unwrap();
        assert_eq!(doc["name"], json!("b"));
        assert_eq!(doc["age"], json!(5));
    }

    #[test]
    fn set_without_merge_replaces_document() {
        let store = InMemoryDocumentStore::new();
        store
            .set_document("c", "1", fields(json!({"name": "a", "age": 5})), true)
            .unwrap();
        store
            .set_document("c", "1", fields(json!({"name": "b"})), false)
            .unwrap();

        let doc = store.document("c", "1").unwrap();
        assert_eq!(doc["name"], json!("b"));
        assert!(!doc.contains_key("age"));
    }

    #[test]
    fn delete_missing_is_success() {
        let store = InMemoryDocumentStore::new();
        store.delete_document("c", "missing").unwrap();
    }

    #[test]
    fn query_filters_and_orders_by_id() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_raw("c", "b", fields(json!({"kind": "x"})))
            .unwrap();
        store
            .insert_raw("c", "a", fields(json!({"kind": "x"})))
            .unwrap();
        store
            .insert_raw("c", "z", fields(json!({"kind": "y"})))
            .unwrap();

        let results = store
            .query_documents("c", &Filter::new().eq("kind", "x"))
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn batch_applies_all_ops() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_raw("c", "1", fields(json!({"name": "a", "age": 5})))
            .unwrap();

        let batch = WriteBatch::new()
            .update("c", "1", fields(json!({"name": "b"})))
            .add("c", fields(json!({"name": "new"})));
        store.commit_batch(batch).unwrap();

        assert_eq!(store.collection_len("c"), 2);
        let doc = store.document("c", "1").unwrap();
        assert_eq!(doc["name"], json!("b"));
        assert_eq!(doc["age"], json!(5));
    }

    #[test]
    fn batch_with_invalid_update_applies_nothing() {
        let store = InMemoryDocumentStore::new();

        let batch = WriteBatch::new()
            .add("c", fields(json!({"name": "new"})))
            .update("c", "missing", fields(json!({"name": "b"})));
        let err = store.commit_batch(batch).unwrap_err();

        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(store.collection_len("c"), 0);
    }

    #[test]
    fn watch_delivers_initial_snapshot() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_raw("c", "1", fields(json!({"n": 1})))
            .unwrap();

        let feed = store.watch("c").unwrap();
        match feed.poll(Duration::from_millis(100)).unwrap() {
            Some(FeedEvent::Snapshot(docs)) => assert_eq!(docs.len(), 1),
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn watch_delivers_snapshot_on_change() {
        let store = InMemoryDocumentStore::new();
        let feed = store.watch("c").unwrap();

        // Initial (empty) snapshot.
        assert_eq!(
            feed.poll(Duration::from_millis(100)).unwrap(),
            Some(FeedEvent::Snapshot(Vec::new()))
        );

        store.add_document("c", fields(json!({"n": 1}))).unwrap();
        match feed.poll(Duration::from_millis(100)).unwrap() {
            Some(FeedEvent::Snapshot(docs)) => assert_eq!(docs.len(), 1),
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn watchers_only_see_their_collection() {
        let store = InMemoryDocumentStore::new();
        let feed = store.watch("c").unwrap();
        feed.poll(Duration::from_millis(100)).unwrap();

        store.add_document("other", fields(json!({"n": 1}))).unwrap();
        assert_eq!(feed.poll(Duration::from_millis(20)).unwrap(), None);
    }

    #[test]
    fn dropped_feed_is_pruned() {
        let store = InMemoryDocumentStore::new();
        let feed = store.watch("c").unwrap();
        drop(feed);

        // The next notification prunes the dead watcher without error.
        store.add_document("c", fields(json!({"n": 1}))).unwrap();
        store.add_document("c", fields(json!({"n": 2}))).unwrap();
    }

    #[test]
    fn clone_shares_storage() {
        let store = InMemoryDocumentStore::new();
        let clone = store.clone();

        store
            .insert_raw("c", "1", fields(json!({"n": 1})))
            .unwrap();
        assert!(clone.document("c", "1").is_some());
    }
}
