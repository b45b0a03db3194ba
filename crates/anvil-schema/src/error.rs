use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
 #[error("schema version {0} is frozen")]
 Frozen(String),

 #[error("validation failed")]
 ValidationFailed(Vec<anvil_types::FieldError>),

 #[error("unknown transform '{0}'")]
 UnknownTransform(String),

 #[error("transform failed: {0}")]
 TransformFailed(String),

 #[error("version number {0} is not sequential for this queue")]
 NonSequentialVersion(u32),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

impl From<SchemaError> for anvil_types::AnvilError {
 fn from(err: SchemaError) -> Self {
 match err {
 SchemaError::Frozen(id) => anvil_types::AnvilError::SchemaFrozen(id),
 SchemaError::ValidationFailed(errors) => anvil_types::AnvilError::ValidationFailed(errors),
 SchemaError::UnknownTransform(name) => {
 anvil_types::AnvilError::Storage(format!("unknown transform '{name}'"))
 }
 SchemaError::TransformFailed(msg) => anvil_types::AnvilError::Storage(msg),
 SchemaError::NonSequentialVersion(n) => {
 anvil_types::AnvilError::Storage(format!("version number {n} is not sequential"))
 }
 }
 }
}
