//! Documents - Typed accessor for mapping and reconciliation operations.

use std::collections::HashSet;
use std::marker::PhantomData;

use serde_json::Value;

use crate::document::{Filter, ID_KEY};
use crate::mapping;
use crate::model::Model;
use crate::store::{DocumentStore, WriteBatch};

use super::error::RepositoryError;
use super::subscription::Subscription;

/// Typed accessor for documents of a specific model type.
///
/// Obtained from any store via [`DocumentsExt::documents`]. Holds no state
/// of its own; every operation resolves the collection from the model's
/// static metadata and goes straight to the store.
pub struct Documents<'a, S, M> {
    store: &'a S,
    _marker: PhantomData<M>,
}

impl<'a, S: DocumentStore, M: Model> Documents<'a, S, M> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Fetch a single document by primary identifier.
    pub fn get(&self, id: &str) -> Result<M, RepositoryError> {
        let fields = self
            .store
            .get_document(M::COLLECTION, id)?
            .ok_or_else(|| RepositoryError::NotFound {
                collection: M::COLLECTION.to_string(),
                id: id.to_string(),
            })?;
        mapping::decode(id, fields)
    }

    /// Fetch the first document whose secondary-identifier field equals
    /// `secondary_id`, in store-defined order.
    pub fn get_by_secondary_id(&self, secondary_id: &str) -> Result<M, RepositoryError> {
        let filter = Filter::new().eq(M::SECONDARY_ID_KEY, secondary_id);
        let doc = self
            .store
            .query_documents(M::COLLECTION, &filter)?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::ObjectNotFound {
                collection: M::COLLECTION.to_string(),
                secondary_id: secondary_id.to_string(),
            })?;
        mapping::decode(&doc.id, doc.fields)
    }

    /// Fetch every document matching the filter.
    ///
    /// Strict: the first document that fails to decode aborts the whole
    /// call. The live-update path ([`subscribe`](Self::subscribe)) is the
    /// lenient counterpart.
    pub fn find(&self, filter: &Filter) -> Result<Vec<M>, RepositoryError> {
        self.store
            .query_documents(M::COLLECTION, filter)?
            .into_iter()
            .map(|doc| mapping::decode(&doc.id, doc.fields))
            .collect()
    }

    /// Fetch documents by secondary identifier. `None` applies no filter
    /// and returns the whole collection.
    pub fn find_by_secondary_id(
        &self,
        secondary_id: Option<&str>,
    ) -> Result<Vec<M>, RepositoryError> {
        self.find_with(secondary_id, &Filter::new())
    }

    /// Fetch documents matching both the caller's filter and, when present,
    /// the secondary identifier. For the secondary-identifier key itself the
    /// secondary value is authoritative over any clause in `filter`.
    pub fn find_with(
        &self,
        secondary_id: Option<&str>,
        filter: &Filter,
    ) -> Result<Vec<M>, RepositoryError> {
        let mut merged = filter.clone();
        if let Some(secondary_id) = secondary_id {
            merged.set(M::SECONDARY_ID_KEY, secondary_id);
        }
        self.find(&merged)
    }

    /// Save a model at a known identifier with a merging write.
    ///
    /// With `individual_fields`, the write is restricted to those keys and
    /// every other stored field is left untouched. Idempotent: saving the
    /// same model twice yields the same stored state.
    pub fn save(
        &self,
        model: &M,
        id: &str,
        individual_fields: Option<&[&str]>,
    ) -> Result<(), RepositoryError> {
        let mut fields = mapping::encode(model)?;
        if let Some(keys) = individual_fields {
            fields.retain(|field, _| keys.contains(&field.as_str()));
        }
        self.store.set_document(M::COLLECTION, id, fields, true)?;
        Ok(())
    }

    /// Save keyed by secondary identifier, overriding an existing match.
    ///
    /// Equivalent to [`upsert_with`](Self::upsert_with) with
    /// `override_existing = true`.
    pub fn upsert(&self, model: &M, secondary_id: Option<&str>) -> Result<String, RepositoryError> {
        self.upsert_with(model, secondary_id, true)
    }

    /// Save keyed by secondary identifier.
    ///
    /// Returns the primary identifier of the document that ended up holding
    /// the data. Resolution order:
    /// 1. No secondary identifier fails with `MissingSecondaryId` before
    ///    any store interaction.
    /// 2. A payload that already carries an `id` is written directly to
    ///    that document (merging), with no query.
    /// 3. Otherwise the collection is queried by secondary identifier. A
    ///    match with `override_existing` gets a replacing write (fields
    ///    absent from the payload are deleted); no match, or
    ///    `override_existing = false`, inserts a new document.
    pub fn upsert_with(
        &self,
        model: &M,
        secondary_id: Option<&str>,
        override_existing: bool,
    ) -> Result<String, RepositoryError> {
        let secondary_id = secondary_id.ok_or_else(|| RepositoryError::MissingSecondaryId {
            collection: M::COLLECTION.to_string(),
        })?;

        let mut fields = mapping::encode(model)?;
        fields.insert(
            M::SECONDARY_ID_KEY.to_string(),
            Value::String(secondary_id.to_string()),
        );

        if let Some(Value::String(id)) = fields.get(ID_KEY) {
            let id = id.clone();
            self.store.set_document(M::COLLECTION, &id, fields, true)?;
            return Ok(id);
        }

        let filter = Filter::new().eq(M::SECONDARY_ID_KEY, secondary_id);
        let existing = self.store.query_documents(M::COLLECTION, &filter)?;
        match existing.into_iter().next() {
            Some(doc) if override_existing => {
                self.store
                    .set_document(M::COLLECTION, &doc.id, fields, false)?;
                Ok(doc.id)
            }
            _ => Ok(self.store.add_document(M::COLLECTION, fields)?),
        }
    }

    /// Reconcile a batch of models against the documents currently stored
    /// under `secondary_id`, committing every resulting write atomically.
    ///
    /// Models whose payload carries an `id` matching an existing document
    /// in the secondary-identifier result set get a merging update; every
    /// other model is inserted as a new document. Either the whole batch
    /// applies or none of it does.
    pub fn add_many(
        &self,
        models: &[M],
        secondary_id: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let secondary_id = secondary_id.ok_or_else(|| RepositoryError::MissingSecondaryId {
            collection: M::COLLECTION.to_string(),
        })?;

        let mut known = Vec::new();
        let mut pending = Vec::new();
        for model in models {
            let mut fields = mapping::encode(model)?;
            fields.insert(
                M::SECONDARY_ID_KEY.to_string(),
                Value::String(secondary_id.to_string()),
            );
            match fields.get(ID_KEY) {
                Some(Value::String(id)) => {
                    let id = id.clone();
                    known.push((id, fields));
                }
                _ => pending.push(fields),
            }
        }

        if known.is_empty() && pending.is_empty() {
            return Ok(());
        }

        let filter = Filter::new().eq(M::SECONDARY_ID_KEY, secondary_id);
        let existing = self.store.query_documents(M::COLLECTION, &filter)?;
        let existing_ids: HashSet<&str> = existing.iter().map(|doc| doc.id.as_str()).collect();

        let mut batch = WriteBatch::new();
        for (id, fields) in known {
            if existing_ids.contains(id.as_str()) {
                batch = batch.update(M::COLLECTION, id, fields);
            } else {
                pending.push(fields);
            }
        }
        for fields in pending {
            batch = batch.add(M::COLLECTION, fields);
        }

        tracing::debug!(
            collection = M::COLLECTION,
            ops = batch.len(),
            "committing reconciliation batch"
        );
        self.store.commit_batch(batch)?;
        Ok(())
    }

    /// Delete a document by primary identifier. Deleting an absent document
    /// succeeds.
    pub fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.store.delete_document(M::COLLECTION, id)?;
        Ok(())
    }

    /// Subscribe to live updates for this model's collection.
    ///
    /// Every change delivers the full decoded snapshot to the returned
    /// handle's data channel; undecodable documents are dropped from the
    /// published batch and reported on the handle's error channel. Each
    /// call creates a fully independent feed.
    pub fn subscribe(&self) -> Result<Subscription<M>, RepositoryError>
    where
        M: 'static,
    {
        let feed = self.store.watch(M::COLLECTION)?;
        Ok(Subscription::spawn(feed))
    }
}

/// Extension trait for typed document access on any store.
pub trait DocumentsExt: DocumentStore + Sized {
    /// Get a typed document accessor.
    fn documents<M: Model>(&self) -> Documents<'_, Self, M> {
        Documents::new(self)
    }
}

impl<S: DocumentStore> DocumentsExt for S {}
