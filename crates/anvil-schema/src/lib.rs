//! The Schema engine: field-typed payload validation, schema
//! version freeze semantics, and migration transforms between versions.

pub mod error;
pub mod transform;
pub mod validate;
pub mod versioning;

pub use error::{SchemaError, SchemaResult};
pub use transform::{
 MultiselectToSelectTransform, Payload, RenameFieldTransform, SchemaTransform,
 TransformRegistry,
};
pub use validate::validate_payload;
pub use versioning::{ensure_mutable, freeze_if_unfrozen, next_version_number};
