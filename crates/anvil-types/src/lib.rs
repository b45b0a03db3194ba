//! Core entity types, identifiers, and error kinds shared by every Anvil
//! crate. No behavior lives here; this crate only describes the data
//! model from and the error catalog from 

pub mod entities;
pub mod error;
pub mod field;
pub mod ids;
pub mod manifest;

pub use entities::*;
pub use error::{AnvilError, AnvilResult, FieldError};
pub use field::{Field, FieldMetadata, FieldType, FieldValue, PiiLevel, RedactionPolicy, RetentionDays};
pub use ids::{
 AssignmentId, ExportId, LabelId, LabelerId, QueueId, SampleId, SchemaVersionId, TenantId,
};
pub use manifest::{ExportFormat, ExportManifest, ExportParameters, RedactionMode};
