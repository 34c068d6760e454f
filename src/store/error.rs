//! Store error type

use thiserror::Error;

/// Errors returned by [`KvStore`](super::KvStore) operations
///
/// Absence of a key is the only failure the store knows about. It is an
/// ordinary outcome for callers to branch on, not a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
