use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReclaimerError {
 #[error(transparent)]
 Storage(#[from] anvil_storage::StorageError),
}

pub type ReclaimerResult<T> = Result<T, ReclaimerError>;

impl From<ReclaimerError> for anvil_types::AnvilError {
 fn from(err: ReclaimerError) -> Self {
 match err {
 ReclaimerError::Storage(e) => e.into(),
 }
 }
}
