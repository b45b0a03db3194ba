use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
 #[error("{0}")]
 InvalidRequest(String),

 #[error("io error: {0}")]
 Io(#[from] std::io::Error),

 #[error(transparent)]
 Storage(#[from] anvil_storage::StorageError),
}

pub type ExportResult<T> = Result<T, ExportError>;

impl From<ExportError> for anvil_types::AnvilError {
 fn from(err: ExportError) -> Self {
 match err {
 ExportError::InvalidRequest(msg) => anvil_types::AnvilError::ValidationFailed(vec![
 anvil_types::FieldError {
 field: "request".into(),
 error: msg,
 provided: None,
 },
 ]),
 ExportError::Io(e) => anvil_types::AnvilError::Storage(e.to_string()),
 ExportError::Storage(e) => e.into(),
 }
 }
}
