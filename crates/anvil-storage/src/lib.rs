//! The Storage port and its adapters: an in-memory adapter for
//! tests and single-process deployments, and an optional Postgres adapter
//! for durable multi-process deployments.

pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStorage;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStorage;
pub use traits::{
 AssignmentFilter, AssignmentOrderBy, AssignmentStore, AuditStore, LabelFilter, LabelStore,
 LabelerStore, QueueStore, SampleRefFilter, SampleRefStore, SortOrder, Storage,
};
