use thiserror::Error;

#[derive(Debug, Error)]
pub enum AclError {
 #[error("tenant_mismatch")]
 TenantMismatch,

 #[error("forbidden: {0}")]
 Forbidden(String),
}

pub type AclResult<T> = Result<T, AclError>;

impl From<AclError> for anvil_types::AnvilError {
 fn from(err: AclError) -> Self {
 match err {
 AclError::TenantMismatch => anvil_types::AnvilError::Forbidden("tenant_mismatch".into()),
 AclError::Forbidden(reason) => anvil_types::AnvilError::Forbidden(reason),
 }
 }
}
