//! Documents - Generic field-map representation and equality filters.
//!
//! A document is a mapping from field name to JSON value; this is the
//! store-native shape every model is translated to and from. Filters are
//! ordered lists of equality clauses combined conjunctively.

mod filter;

pub mod datetime;

use serde_json::Value;

/// The store-native representation of an object: field name to value.
pub type FieldMap = serde_json::Map<String, Value>;

/// The distinguished field holding a document's primary identifier.
pub const ID_KEY: &str = "id";

/// A document together with its store-assigned primary identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: FieldMap,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

pub use filter::Filter;
