//! documap - Typed document mapping and reconciliation over pluggable
//! document stores.
//!
//! A [`Model`] declares where its documents live and which field serves as
//! its secondary identifier; [`Documents`] maps models to and from generic
//! field-maps and reconciles them against what a [`DocumentStore`] already
//! holds: merging saves by identifier, secondary-key upserts, atomic
//! batches, and live collection snapshots over a [`Subscription`] handle.
//!
//! ## Example
//!
//! ```
//! use documap::{DocumentsExt, InMemoryDocumentStore, Model};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Clone)]
//! struct Profile {
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     id: Option<String>,
//!     handle: String,
//!     display_name: String,
//! }
//!
//! impl Model for Profile {
//!     const COLLECTION: &'static str = "profiles";
//!     const SECONDARY_ID_KEY: &'static str = "handle";
//! }
//!
//! let store = InMemoryDocumentStore::new();
//! let profiles = store.documents::<Profile>();
//!
//! let profile = Profile {
//!     id: None,
//!     handle: "pat".into(),
//!     display_name: "Pat".into(),
//! };
//! let id = profiles.upsert(&profile, Some("pat")).unwrap();
//! assert_eq!(profiles.get(&id).unwrap().display_name, "Pat");
//! ```

mod document;
mod mapping;
mod model;
mod repository;
mod store;

pub use document::{datetime, FieldMap, Filter, StoredDocument, ID_KEY};
pub use mapping::{decode, encode};
pub use model::Model;
pub use repository::{Documents, DocumentsExt, RepositoryError, Subscription, SubscriptionError};
pub use store::{
    ChangeFeed, DocumentStore, FeedEvent, InMemoryChangeFeed, InMemoryDocumentStore, StoreError,
    WriteBatch, WriteOp,
};
