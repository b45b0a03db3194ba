//! `DaemonError`: the top-level error for the reference binary. Lower-crate
//! errors convert in via `#[from]`, the same wrapping convention
//! `anvil-coordinator::CoordinatorError` uses one layer down.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Coordinator(#[from] anvil_coordinator::CoordinatorError),

    #[error(transparent)]
    Reclaimer(#[from] anvil_reclaimer::ReclaimerError),

    #[error(transparent)]
    Retention(#[from] anvil_retention::RetentionError),

    #[error(transparent)]
    Export(#[from] anvil_export::ExportError),

    #[error(transparent)]
    Storage(#[from] anvil_storage::StorageError),
}

pub type DaemonResult<T> = Result<T, DaemonError>;

impl From<config::ConfigError> for DaemonError {
    fn from(err: config::ConfigError) -> Self {
        DaemonError::Config(err.to_string())
    }
}
