//! Models - The per-type storage contract.
//!
//! A model declares, as static metadata, where its documents live and which
//! field serves as its application-level secondary identifier. The mapping
//! between a model and its stored field-map is plain serde metadata, with
//! every field explicit on the type.
//!
//! ## Example
//!
//! ```
//! use documap::Model;
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
//! ```

use serde::{de::DeserializeOwned, Serialize};

/// Trait for types that can be stored as documents.
pub trait Model: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// The collection path for this model type. Every persisted document of
    /// the type lives in exactly this collection.
    const COLLECTION: &'static str;

    /// The name of the field used for application-level lookups, distinct
    /// from the store-assigned primary identifier. Uniqueness is not
    /// enforced by this layer: lookups by secondary identifier take the
    /// first result in store-defined order when duplicates exist.
    const SECONDARY_ID_KEY: &'static str;
}
