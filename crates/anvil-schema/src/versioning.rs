//! Schema version lifecycle helpers: sequential numbering, freeze-on-first-write,
//! and the immutability guard.

use anvil_types::SchemaVersion;
use chrono::{DateTime, Utc};

use crate::error::{SchemaError, SchemaResult};

/// Fails with [`SchemaError::Frozen`] if `version` is already frozen.
/// Callers invoke this before any mutation of a `SchemaVersion`'s
/// `definition`.
pub fn ensure_mutable(version: &SchemaVersion) -> SchemaResult<()> {
 if version.is_frozen() {
 return Err(SchemaError::Frozen(version.id.to_string()));
 }
 Ok(())
}

/// The version number a newly created `SchemaVersion` for this queue must
/// carry: one past the highest existing version number, or `1` for a
/// queue's first schema. `existing` need not be sorted.
pub fn next_version_number(existing: &[SchemaVersion]) -> u32 {
 existing.iter().map(|v| v.version_number).max().unwrap_or(0) + 1
}

/// Builds the frozen-at-write SchemaVersion state: returns the timestamp
/// to persist iff the version isn't already frozen (freezing is
/// idempotent at the storage layer, but this lets callers skip the write
/// when it would be a no-op).
pub fn freeze_if_unfrozen(version: &SchemaVersion, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
 if version.is_frozen() {
 None
 } else {
 Some(at)
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use anvil_types::{QueueId, SchemaVersionId};

 fn version(number: u32, frozen: bool) -> SchemaVersion {
 SchemaVersion {
 id: SchemaVersionId::generate(),
 queue_id: QueueId::generate(),
 version_number: number,
 definition: vec![],
 transform_from_previous: None,
 frozen_at: frozen.then(Utc::now),
 }
 }

 #[test]
 fn next_version_number_increments_from_max() {
 let existing = vec![version(1, true), version(2, true)];
 assert_eq!(next_version_number(&existing), 3);
 }

 #[test]
 fn next_version_number_starts_at_one() {
 assert_eq!(next_version_number(&[]), 1);
 }

 #[test]
 fn ensure_mutable_rejects_frozen_version() {
 let frozen = version(1, true);
 assert!(matches!(ensure_mutable(&frozen), Err(SchemaError::Frozen(_))));
 }

 #[test]
 fn freeze_if_unfrozen_is_idempotent() {
 let frozen = version(1, true);
 assert!(freeze_if_unfrozen(&frozen, Utc::now()).is_none());
 let unfrozen = version(1, false);
 assert!(freeze_if_unfrozen(&unfrozen, Utc::now()).is_some());
 }
}
