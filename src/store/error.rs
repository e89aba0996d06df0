use std::fmt;

/// Error type for document store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Storage-level failure (a rejected write, an invalid batch, backend
    /// errors surfaced by an implementation).
    Storage(String),
    /// A shared lock was poisoned during the named operation.
    LockPoisoned(&'static str),
    /// The transport under a change feed failed or the feed closed.
    Transport(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Storage(message) => write!(f, "store error: {}", message),
            StoreError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
            StoreError::Transport(message) => write!(f, "transport error: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}
