use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleProviderError {
 #[error("sample not found: {0}")]
 NotFound(String),

 #[error("sample provider unavailable")]
 ProviderUnavailable,

 #[error("sample provider timed out")]
 Timeout,

 #[error("underlying storage error: {0}")]
 Storage(#[from] anvil_storage::StorageError),
}

pub type SampleProviderResult<T> = Result<T, SampleProviderError>;

impl From<SampleProviderError> for anvil_types::AnvilError {
 fn from(err: SampleProviderError) -> Self {
 match err {
 SampleProviderError::NotFound(msg) => anvil_types::AnvilError::NotFound(msg),
 SampleProviderError::ProviderUnavailable => {
 anvil_types::AnvilError::ProviderUnavailable
 }
 SampleProviderError::Timeout => anvil_types::AnvilError::ProviderUnavailable,
 SampleProviderError::Storage(e) => anvil_types::AnvilError::from(e),
 }
 }
}
