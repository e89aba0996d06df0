use std::fmt;

use crate::store::StoreError;

/// Error type for repository operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Identifier-addressed fetch found no document.
    NotFound { collection: String, id: String },
    /// Secondary-identifier fetch found no match.
    ObjectNotFound {
        collection: String,
        secondary_id: String,
    },
    /// A stored document could not be converted to the target model.
    Decode {
        collection: String,
        id: String,
        message: String,
    },
    /// A model could not be represented as a field-map.
    Encode { collection: String, message: String },
    /// A secondary-identifier-keyed operation was invoked without a value.
    MissingSecondaryId { collection: String },
    /// The underlying store failed.
    Store(StoreError),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::NotFound { collection, id } => {
                write!(f, "document not found: {}:{}", collection, id)
            }
            RepositoryError::ObjectNotFound {
                collection,
                secondary_id,
            } => write!(
                f,
                "no document in {} with secondary identifier {:?}",
                collection, secondary_id
            ),
            RepositoryError::Decode {
                collection,
                id,
                message,
            } => write!(f, "decode failed for {}:{}: {}", collection, id, message),
            RepositoryError::Encode {
                collection,
                message,
            } => write!(f, "encode failed for {}: {}", collection, message),
            RepositoryError::MissingSecondaryId { collection } => {
                write!(f, "missing secondary identifier for {}", collection)
            }
            RepositoryError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepositoryError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        RepositoryError::Store(err)
    }
}
