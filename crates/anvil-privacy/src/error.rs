use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrivacyError {
 #[error("invalid HMAC key length")]
 InvalidKey,

 #[error("invalid regex pattern: {0}")]
 InvalidPattern(String),
}

pub type PrivacyResult<T> = Result<T, PrivacyError>;
