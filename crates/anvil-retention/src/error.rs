use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetentionError {
 #[error(transparent)]
 Storage(#[from] anvil_storage::StorageError),
}

pub type RetentionResult<T> = Result<T, RetentionError>;

impl From<RetentionError> for anvil_types::AnvilError {
 fn from(err: RetentionError) -> Self {
 match err {
 RetentionError::Storage(e) => e.into(),
 }
 }
}
