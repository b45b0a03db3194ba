use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
 #[error("labeler is blocked from this queue")]
 Blocked,

 #[error("labeler has reached max_concurrent_assignments")]
 MaxConcurrentExceeded,

 #[error("no available work")]
 NoAvailableWork,
}

pub type PolicyResult<T> = Result<T, PolicyError>;

impl From<PolicyError> for anvil_types::AnvilError {
 fn from(err: PolicyError) -> Self {
 match err {
 PolicyError::Blocked => anvil_types::AnvilError::Forbidden("blocked".into()),
 PolicyError::MaxConcurrentExceeded => {
 anvil_types::AnvilError::Forbidden("max_concurrent_exceeded".into())
 }
 PolicyError::NoAvailableWork => anvil_types::AnvilError::NoAvailableWork,
 }
 }
}
