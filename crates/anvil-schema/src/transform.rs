//! Migration transforms between consecutive [`SchemaVersion`]s (spec
//! §4.6). A transform must satisfy the round-trip property tested in
//! `proptest_transform.rs`: `backward(forward(x)) == x` for every `x`
//! valid under the predecessor version.

use anvil_types::field::FieldValue;
use std::collections::BTreeMap;

use crate::error::{SchemaError, SchemaResult};

pub type Payload = BTreeMap<String, FieldValue>;

/// A named, reversible transform between one schema version and the next.
pub trait SchemaTransform: Send + Sync {
 fn name(&self) -> &str;

 fn forward(&self, old_payload: &Payload) -> SchemaResult<Payload>;

 fn backward(&self, new_payload: &Payload) -> SchemaResult<Payload>;
}

/// Renames a field, leaving every other key untouched.
pub struct RenameFieldTransform {
 name: String,
 from: String,
 to: String,
}

impl RenameFieldTransform {
 pub fn new(name: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
 Self {
 name: name.into(),
 from: from.into(),
 to: to.into(),
 }
 }
}

impl SchemaTransform for RenameFieldTransform {
 fn name(&self) -> &str {
 &self.name
 }

 fn forward(&self, old_payload: &Payload) -> SchemaResult<Payload> {
 let mut next = old_payload.clone();
 if let Some(value) = next.remove(&self.from) {
 next.insert(self.to.clone(), value);
 }
 Ok(next)
 }

 fn backward(&self, new_payload: &Payload) -> SchemaResult<Payload> {
 let mut previous = new_payload.clone();
 if let Some(value) = previous.remove(&self.to) {
 previous.insert(self.from.clone(), value);
 }
 Ok(previous)
 }
}

/// Splits a `MultiSelect` field into a `Select` field carrying only its
/// first element forward, and reconstitutes the original list (of one
/// element) going backward. A stand-in for the kind of lossy-but-specified
/// migration a queue operator might register; real deployments supply
/// their own [`SchemaTransform`] implementations.
pub struct MultiselectToSelectTransform {
 name: String,
 field: String,
}

impl MultiselectToSelectTransform {
 pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
 Self {
 name: name.into(),
 field: field.into(),
 }
 }
}

impl SchemaTransform for MultiselectToSelectTransform {
 fn name(&self) -> &str {
 &self.name
 }

 fn forward(&self, old_payload: &Payload) -> SchemaResult<Payload> {
 let mut next = old_payload.clone();
 if let Some(FieldValue::MultiSelect(items)) = next.get(&self.field).cloned() {
 let first = items.into_iter().next().ok_or_else(|| {
 SchemaError::TransformFailed(format!(
 "field '{}' has no values to migrate forward",
 self.field
))
 })?;
 next.insert(self.field.clone(), FieldValue::Select(first));
 }
 Ok(next)
 }

 fn backward(&self, new_payload: &Payload) -> SchemaResult<Payload> {
 let mut previous = new_payload.clone();
 if let Some(FieldValue::Select(value)) = previous.get(&self.field).cloned() {
 previous.insert(self.field.clone(), FieldValue::MultiSelect(vec![value]));
 }
 Ok(previous)
 }
}

/// Registry mapping a [`anvil_types::entities::TransformRef`]'s name to its
/// implementation; `SchemaVersion` only stores the name, the way the
/// teacher keeps strategy selection as a small enum/registry rather than
/// serializing behavior.
#[derive(Default)]
pub struct TransformRegistry {
 transforms: std::collections::HashMap<String, Box<dyn SchemaTransform>>,
}

impl TransformRegistry {
 pub fn new() -> Self {
 Self::default()
 }

 pub fn register(&mut self, transform: Box<dyn SchemaTransform>) -> &mut Self {
 self.transforms.insert(transform.name.to_string(), transform);
 self
 }

 pub fn get(&self, name: &str) -> SchemaResult<&dyn SchemaTransform> {
 self.transforms
.get(name)
.map(|t| t.as_ref())
.ok_or_else(|| SchemaError::UnknownTransform(name.to_string()))
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 fn payload(pairs: &[(&str, FieldValue)]) -> Payload {
 pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
 }

 #[test]
 fn rename_transform_round_trips() {
 let transform = RenameFieldTransform::new("v1_to_v2", "category", "cat");
 let old = payload(&[("category", FieldValue::Select("a".into()))]);
 let forward = transform.forward(&old).unwrap();
 assert!(forward.contains_key("cat"));
 let back = transform.backward(&forward).unwrap();
 assert_eq!(back, old);
 }

 #[test]
 fn registry_rejects_unknown_transform() {
 let registry = TransformRegistry::new();
 assert!(matches!(
 registry.get("nope"),
 Err(SchemaError::UnknownTransform(_))
));
 }
}
