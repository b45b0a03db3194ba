//! Strongly-typed identifiers for Anvil entities.
//!
//! All IDs are UUID-based but wrapped in newtype structs so that, for
//! example, a `LabelId` can never be passed where an `AssignmentId` is
//! expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Tenant identifier. The isolation boundary for every other entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(Uuid);

impl TenantId {
 pub fn generate() -> Self {
 Self(Uuid::new_v4())
 }

 pub fn from_uuid(uuid: Uuid) -> Self {
 Self(uuid)
 }

 pub fn as_uuid(&self) -> &Uuid {
 &self.0
 }
}

impl fmt::Display for TenantId {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 write!(f, "tenant_{}", self.0)
 }
}

/// Queue identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueId(Uuid);

impl QueueId {
 pub fn generate() -> Self {
 Self(Uuid::new_v4())
 }

 pub fn from_uuid(uuid: Uuid) -> Self {
 Self(uuid)
 }

 pub fn as_uuid(&self) -> &Uuid {
 &self.0
 }
}

impl fmt::Display for QueueId {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 write!(f, "queue_{}", self.0)
 }
}

/// Schema version identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersionId(Uuid);

impl SchemaVersionId {
 pub fn generate() -> Self {
 Self(Uuid::new_v4())
 }

 pub fn from_uuid(uuid: Uuid) -> Self {
 Self(uuid)
 }

 pub fn as_uuid(&self) -> &Uuid {
 &self.0
 }
}

impl fmt::Display for SchemaVersionId {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 write!(f, "schema_{}", self.0)
 }
}

/// Assignment identifier. Stable for the lifetime of the assignment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(Uuid);

impl AssignmentId {
 pub fn generate() -> Self {
 Self(Uuid::new_v4())
 }

 pub fn from_uuid(uuid: Uuid) -> Self {
 Self(uuid)
 }

 pub fn as_uuid(&self) -> &Uuid {
 &self.0
 }
}

impl fmt::Display for AssignmentId {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 write!(f, "asg_{}", self.0)
 }
}

/// Label identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelId(Uuid);

impl LabelId {
 pub fn generate() -> Self {
 Self(Uuid::new_v4())
 }

 pub fn from_uuid(uuid: Uuid) -> Self {
 Self(uuid)
 }

 pub fn as_uuid(&self) -> &Uuid {
 &self.0
 }
}

impl fmt::Display for LabelId {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 write!(f, "lbl_{}", self.0)
 }
}

/// Labeler identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabelerId(Uuid);

impl LabelerId {
 pub fn generate() -> Self {
 Self(Uuid::new_v4())
 }

 pub fn from_uuid(uuid: Uuid) -> Self {
 Self(uuid)
 }

 pub fn as_uuid(&self) -> &Uuid {
 &self.0
 }
}

impl fmt::Display for LabelerId {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 write!(f, "lblr_{}", self.0)
 }
}

/// Sample identifier. Samples are owned by the external sample provider;
/// Anvil only ever holds this reference plus a pinned version tag. Order
/// is lexicographic on the underlying string, used as the RoundRobin
/// selector's tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SampleId(String);

impl SampleId {
 pub fn new(id: impl Into<String>) -> Self {
 Self(id.into())
 }

 pub fn as_str(&self) -> &str {
 &self.0
 }
}

impl fmt::Display for SampleId {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 write!(f, "{}", self.0)
 }
}

/// Export identifier, rendered as `exp_<ulid-shaped-string>` per the
/// manifest wire format. No `ulid` crate is present anywhere in the
/// example pack this repo was grounded on, so the 26-character
/// Crockford-base32 ULID shape (48-bit millisecond timestamp followed by
/// 80 bits of randomness) is synthesized locally instead of reaching for
/// an otherwise-ungrounded dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExportId(String);

const CROCKFORD_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

impl ExportId {
 /// Generate a new export id from a millisecond timestamp and an RNG.
 pub fn generate(now_millis: u64, rng: &mut impl rand::RngCore) -> Self {
 let mut bits: u128 = (now_millis as u128) << 80;
 let mut random_bytes = [0u8; 10];
 rng.fill_bytes(&mut random_bytes);
 let random: u128 = random_bytes
.iter()
.fold(0u128, |acc, b| (acc << 8) | *b as u128);
 bits |= random;

 let mut chars = [0u8; 26];
 for (i, slot) in chars.iter_mut().enumerate() {
 let shift = 125 - (i as u32 + 1) * 5;
 let index = ((bits >> shift) & 0x1F) as usize;
 *slot = CROCKFORD_ALPHABET[index];
 }
 Self(format!("exp_{}", String::from_utf8_lossy(&chars)))
 }

 pub fn as_str(&self) -> &str {
 &self.0
 }
}

impl fmt::Display for ExportId {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 write!(f, "{}", self.0)
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn tenant_id_generation_is_unique() {
 let a = TenantId::generate();
 let b = TenantId::generate();
 assert_ne!(a, b);
 }

 #[test]
 fn assignment_id_display_has_prefix() {
 let id = AssignmentId::generate();
 assert!(format!("{id}").starts_with("asg_"));
 }

 #[test]
 fn export_id_has_expected_shape() {
 let mut rng = rand::thread_rng();
 let id = ExportId::generate(1_700_000_000_000, &mut rng);
 assert!(id.as_str().starts_with("exp_"));
 assert_eq!(id.as_str().len(), "exp_".len() + 26);
 }

 #[test]
 fn export_id_timestamp_component_is_monotonic() {
 let mut rng = rand::thread_rng();
 let earlier = ExportId::generate(1_000, &mut rng);
 let mut rng2 = rand::thread_rng();
 let later = ExportId::generate(2_000, &mut rng2);
 assert!(later.as_str() > earlier.as_str());
 }
}
