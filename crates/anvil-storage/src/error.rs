use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
 #[error("record not found: {0}")]
 NotFound(String),

 #[error("stale optimistic lock on {0}")]
 Stale(String),

 #[error("unique constraint violated: {0}")]
 Conflict(String),

 #[error("invariant violation: {0}")]
 InvariantViolation(String),

 #[error("backend error: {0}")]
 Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for anvil_types::AnvilError {
 fn from(err: StorageError) -> Self {
 match err {
 StorageError::NotFound(msg) => anvil_types::AnvilError::NotFound(msg),
 StorageError::Stale(msg) => anvil_types::AnvilError::Stale(msg),
 StorageError::Conflict(msg) => anvil_types::AnvilError::Storage(msg),
 StorageError::InvariantViolation(msg) => anvil_types::AnvilError::Storage(msg),
 StorageError::Backend(msg) => anvil_types::AnvilError::Storage(msg),
 }
 }
}
