//! Repository - The mapping and reconciliation service.
//!
//! Typed CRUD, secondary-identifier upsert reconciliation, atomic batch
//! writes, and live-update subscriptions, all generic over the model type
//! and the backing [`DocumentStore`](crate::store::DocumentStore).

mod documents;
mod error;
mod subscription;

pub use documents::{Documents, DocumentsExt};
pub use error::RepositoryError;
pub use subscription::{Subscription, SubscriptionError};
