use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
 #[error("audit store error: {0}")]
 Storage(#[from] anvil_storage::StorageError),

 #[error("audit chain hash mismatch: expected previous hash {expected:?}, found {found:?}")]
 ChainBroken {
 expected: Option<String>,
 found: Option<String>,
 },
}

pub type AuditResult<T> = Result<T, AuditError>;
