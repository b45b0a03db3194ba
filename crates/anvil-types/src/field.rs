//! Field definitions and the dynamic, tagged value type label payloads are
//! built from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The type a [`Field`] accepts. Determines both validation rules and the
/// [`FieldValue`] variant a normalized value takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
 Text,
 Select,
 Multiselect,
 Range,
 Number,
 Boolean,
 Date,
 Datetime,
}

/// How sensitive a field's content is. Drives the default redaction policy
/// suggestion but never overrides an explicit one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiLevel {
 None,
 Possible,
 Likely,
 Definite,
}

/// How a field's value is treated when an export runs with redaction
/// enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionPolicy {
 Preserve,
 Strip,
 Truncate,
 Hash,
 RegexRedact,
}

/// Retention window for a field's stored values, in days. `Indefinite`
/// corresponds to the `retention_days ∈ ℕ∪{∞}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionDays {
 Days(u32),
 Indefinite,
}

/// Privacy and lifecycle metadata attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
 pub pii: PiiLevel,
 pub retention_days: RetentionDays,
 pub redaction_policy: RedactionPolicy,
}

impl Default for FieldMetadata {
 fn default() -> Self {
 Self {
 pii: PiiLevel::None,
 retention_days: RetentionDays::Indefinite,
 redaction_policy: RedactionPolicy::Preserve,
 }
 }
}

/// One field of a schema's `definition`. Identified by `name` within the
/// schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
 pub name: String,
 pub field_type: FieldType,
 pub required: bool,
 pub options: Option<BTreeSet<String>>,
 pub min: Option<i64>,
 pub max: Option<i64>,
 pub pattern: Option<String>,
 pub default: Option<FieldValue>,
 pub metadata: FieldMetadata,
}

impl Field {
 pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
 Self {
 name: name.into(),
 field_type,
 required: false,
 options: None,
 min: None,
 max: None,
 pattern: None,
 default: None,
 metadata: FieldMetadata::default(),
 }
 }
}

/// A heterogeneous label field value, normalized to the variant matching
/// its field's [`FieldType`]. Per the dynamic field map design note, this
/// is the statically typed stand-in for the source's untyped payload map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
 Text(String),
 Select(String),
 MultiSelect(Vec<String>),
 Range(i64),
 Number(f64),
 Boolean(bool),
 Date(chrono::NaiveDate),
 DateTime(chrono::DateTime<chrono::Utc>),
}

impl FieldValue {
 /// The [`FieldType`] this value would normalize to.
 pub fn field_type(&self) -> FieldType {
 match self {
 FieldValue::Text(_) => FieldType::Text,
 FieldValue::Select(_) => FieldType::Select,
 FieldValue::MultiSelect(_) => FieldType::Multiselect,
 FieldValue::Range(_) => FieldType::Range,
 FieldValue::Number(_) => FieldType::Number,
 FieldValue::Boolean(_) => FieldType::Boolean,
 FieldValue::Date(_) => FieldType::Date,
 FieldValue::DateTime(_) => FieldType::Datetime,
 }
 }

 /// A stable string rendering used by CSV export and hashing; not the
 /// same as `Display` for human consumption.
 pub fn to_export_string(&self) -> String {
 match self {
 FieldValue::Text(s) | FieldValue::Select(s) => s.clone(),
 FieldValue::MultiSelect(items) => items.join(";"),
 FieldValue::Range(n) => n.to_string(),
 FieldValue::Number(n) => n.to_string(),
 FieldValue::Boolean(b) => b.to_string(),
 FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
 FieldValue::DateTime(dt) => dt.to_rfc3339(),
 }
 }
}
