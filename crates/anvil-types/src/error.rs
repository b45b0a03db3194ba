//! Error kinds shared across every Anvil crate. Each downstream
//! crate defines its own `thiserror` enum and wraps this one where it
//! needs to surface a core error kind unmodified.

use thiserror::Error;

/// A field-level validation failure, one of possibly several returned
/// together from schema validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("field '{field}': {error}")]
pub struct FieldError {
 pub field: String,
 pub error: String,
 pub provided: Option<String>,
}

/// The error kinds named Every component-specific error enum
/// converts into one of these at its boundary.
#[derive(Debug, Error)]
pub enum AnvilError {
 #[error("not found: {0}")]
 NotFound(String),

 #[error("forbidden: {0}")]
 Forbidden(String),

 #[error("invalid transition from {from} to {to}")]
 InvalidTransition { from: String, to: String },

 #[error("stale optimistic lock on {0}")]
 Stale(String),

 #[error("no available work")]
 NoAvailableWork,

 #[error("validation failed")]
 ValidationFailed(Vec<FieldError>),

 #[error("schema version {0} is frozen")]
 SchemaFrozen(String),

 #[error("sample provider unavailable")]
 ProviderUnavailable,

 #[error("insufficient labels for agreement computation")]
 InsufficientLabels,

 #[error("storage error: {0}")]
 Storage(String),
}

pub type AnvilResult<T> = Result<T, AnvilError>;
