//! `CoordinatorError`: the umbrella error type for every
//! dispatch/submit/skip call. Lower-crate errors convert in via `#[from]`,
//! matching `StateError::Registry(#[from] palm_registry::
//! RegistryError)` wrapping convention.

use anvil_types::{AnvilError, FieldError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
 #[error("not found: {0}")]
 NotFound(String),

 #[error("invalid transition from {from} to {to}")]
 InvalidTransition { from: String, to: String },

 #[error("validation failed")]
 ValidationFailed(Vec<FieldError>),

 #[error(transparent)]
 Acl(#[from] anvil_acl::AclError),

 #[error(transparent)]
 Policy(#[from] anvil_policy::PolicyError),

 #[error(transparent)]
 Schema(#[from] anvil_schema::SchemaError),

 #[error(transparent)]
 Storage(#[from] anvil_storage::StorageError),

 #[error(transparent)]
 SampleProvider(#[from] anvil_sample_provider::SampleProviderError),
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

impl From<CoordinatorError> for AnvilError {
 fn from(err: CoordinatorError) -> Self {
 match err {
 CoordinatorError::NotFound(msg) => AnvilError::NotFound(msg),
 CoordinatorError::InvalidTransition { from, to } => {
 AnvilError::InvalidTransition { from, to }
 }
 CoordinatorError::ValidationFailed(errors) => AnvilError::ValidationFailed(errors),
 CoordinatorError::Acl(e) => e.into(),
 CoordinatorError::Policy(e) => e.into(),
 CoordinatorError::Schema(e) => e.into(),
 CoordinatorError::Storage(e) => e.into(),
 CoordinatorError::SampleProvider(e) => e.into(),
 }
 }
}
