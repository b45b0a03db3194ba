//! Payload validation against a frozen or mutable [`SchemaVersion`] (spec
//! §4.6). Mirrors "validate, collect every error, return
//! normalized value or the error list" shape (`palm-policy::evaluator`)
//! rather than failing fast on the first bad field.

use anvil_types::field::{Field, FieldType, FieldValue};
use anvil_types::{FieldError, SchemaVersion};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Validates `raw` against `schema`'s field definitions.
///
/// Unknown keys are dropped silently (this tolerance is intentional per
/// OQ1) and logged at `warn`. On success returns the
/// normalized payload; on any field error returns the full ordered list
/// rather than stopping at the first one.
pub fn validate_payload(
 schema: &SchemaVersion,
 raw: &serde_json::Map<String, Value>,
) -> Result<BTreeMap<String, FieldValue>, Vec<FieldError>> {
 let mut errors = Vec::new();
 let mut normalized = BTreeMap::new();

 for field in &schema.definition {
 match raw.get(&field.name) {
 None | Some(Value::Null) => {
 if field.required {
 errors.push(FieldError {
 field: field.name.clone(),
 error: "required field is missing".into(),
 provided: None,
 });
 } else if let Some(default) = &field.default {
 normalized.insert(field.name.clone(), default.clone());
 }
 }
 Some(value) => match normalize_field(field, value) {
 Ok(normalized_value) => {
 normalized.insert(field.name.clone(), normalized_value);
 }
 Err(error) => errors.push(error),
 },
 }
 }

 let known: std::collections::HashSet<&str> =
 schema.definition.iter().map(|f| f.name.as_str()).collect();
 for key in raw.keys() {
 if !known.contains(key.as_str()) {
 warn!(schema_version = %schema.id, field = %key, "dropping unknown payload field");
 }
 }

 if errors.is_empty() {
 Ok(normalized)
 } else {
 Err(errors)
 }
}

fn normalize_field(field: &Field, value: &Value) -> Result<FieldValue, FieldError> {
 let err = |msg: &str| FieldError {
 field: field.name.clone(),
 error: msg.to_string(),
 provided: Some(value.to_string()),
 };

 match field.field_type {
 FieldType::Text => {
 let s = value.as_str().ok_or_else(|| err("expected a string"))?;
 if let Some(pattern) = &field.pattern {
 let re = regex::Regex::new(pattern)
.map_err(|_| err("field has an invalid pattern configured"))?;
 if !re.is_match(s) {
 return Err(err("value does not match required pattern"));
 }
 }
 if let Some(max) = field.max() {
 if s.chars().count() as i64 > max {
 return Err(err("value exceeds maximum length"));
 }
 }
 Ok(FieldValue::Text(s.to_string()))
 }
 FieldType::Select => {
 let s = value.as_str().ok_or_else(|| err("expected a string"))?;
 match &field.options {
 Some(options) if options.contains(s) => Ok(FieldValue::Select(s.to_string())),
 Some(_) => Err(err("value is not one of the allowed options")),
 None => Ok(FieldValue::Select(s.to_string())),
 }
 }
 FieldType::Multiselect => {
 let array = value.as_array().ok_or_else(|| err("expected an array"))?;
 let mut seen = std::collections::HashSet::new();
 let mut values = Vec::with_capacity(array.len());
 for item in array {
 let s = item
.as_str()
.ok_or_else(|| err("expected an array of strings"))?;
 if let Some(options) = &field.options {
 if !options.contains(s) {
 return Err(err("value is not one of the allowed options"));
 }
 }
 if !seen.insert(s.to_string()) {
 return Err(err("duplicate value in multiselect"));
 }
 values.push(s.to_string());
 }
 Ok(FieldValue::MultiSelect(values))
 }
 FieldType::Range => {
 let n = value.as_i64().ok_or_else(|| err("expected an integer"))?;
 if let Some(min) = field.min() {
 if n < min {
 return Err(err("value is below the minimum"));
 }
 }
 if let Some(max) = field.max() {
 if n > max {
 return Err(err("value is above the maximum"));
 }
 }
 Ok(FieldValue::Range(n))
 }
 FieldType::Number => {
 let n = value.as_f64().ok_or_else(|| err("expected a number"))?;
 if !n.is_finite() {
 return Err(err("value must be finite"));
 }
 Ok(FieldValue::Number(n))
 }
 FieldType::Boolean => {
 let b = value.as_bool().ok_or_else(|| err("expected a boolean"))?;
 Ok(FieldValue::Boolean(b))
 }
 FieldType::Date => {
 let s = value.as_str().ok_or_else(|| err("expected an ISO-8601 date string"))?;
 let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
.map_err(|_| err("value is not a valid ISO-8601 date"))?;
 Ok(FieldValue::Date(date))
 }
 FieldType::Datetime => {
 let s = value
.as_str()
.ok_or_else(|| err("expected an ISO-8601 datetime string"))?;
 let dt = chrono::DateTime::parse_from_rfc3339(s)
.map_err(|_| err("value is not a valid ISO-8601 datetime"))?
.with_timezone(&chrono::Utc);
 Ok(FieldValue::DateTime(dt))
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use anvil_types::field::FieldMetadata;
 use anvil_types::{QueueId, SchemaVersionId};
 use std::collections::BTreeSet;

 fn schema_with(fields: Vec<Field>) -> SchemaVersion {
 SchemaVersion {
 id: SchemaVersionId::generate(),
 queue_id: QueueId::generate(),
 version_number: 1,
 definition: fields,
 transform_from_previous: None,
 frozen_at: None,
 }
 }

 #[test]
 fn required_field_missing_is_reported() {
 let schema = schema_with(vec![Field {
 required: true,
..Field::new("cat", FieldType::Select)
 }]);
 let raw = serde_json::Map::new();
 let result = validate_payload(&schema, &raw);
 assert!(result.is_err());
 let errors = result.unwrap_err();
 assert_eq!(errors[0].field, "cat");
 }

 #[test]
 fn select_rejects_value_outside_options() {
 let mut options = BTreeSet::new();
 options.insert("a".to_string());
 options.insert("b".to_string());
 let schema = schema_with(vec![Field {
 options: Some(options),
 required: true,
..Field::new("cat", FieldType::Select)
 }]);
 let mut raw = serde_json::Map::new();
 raw.insert("cat".into(), Value::String("c".into()));
 let result = validate_payload(&schema, &raw);
 assert!(result.is_err());
 }

 #[test]
 fn unknown_fields_are_dropped_silently() {
 let schema = schema_with(vec![Field::new("cat", FieldType::Text)]);
 let mut raw = serde_json::Map::new();
 raw.insert("cat".into(), Value::String("hello".into()));
 raw.insert("mystery".into(), Value::Bool(true));
 let normalized = validate_payload(&schema, &raw).unwrap();
 assert_eq!(normalized.len(), 1);
 assert!(normalized.contains_key("cat"));
 }

 #[test]
 fn range_enforces_bounds() {
 let schema = schema_with(vec![Field {
 min: Some(1),
 max: Some(5),
 required: true,
..Field::new("score", FieldType::Range)
 }]);
 let mut raw = serde_json::Map::new();
 raw.insert("score".into(), Value::from(7));
 assert!(validate_payload(&schema, &raw).is_err());

 let mut raw = serde_json::Map::new();
 raw.insert("score".into(), Value::from(3));
 let normalized = validate_payload(&schema, &raw).unwrap();
 assert_eq!(normalized.get("score"), Some(&FieldValue::Range(3)));
 }

 #[test]
 fn multiselect_rejects_duplicates() {
 let mut options = BTreeSet::new();
 options.insert("x".to_string());
 let schema = schema_with(vec![Field {
 options: Some(options),
 required: true,
..Field::new("tags", FieldType::Multiselect)
 }]);
 let mut raw = serde_json::Map::new();
 raw.insert(
 "tags".into(),
 Value::Array(vec![Value::String("x".into()), Value::String("x".into())]),
);
 assert!(validate_payload(&schema, &raw).is_err());
 }

 #[allow(dead_code)]
 fn use_default_metadata() -> FieldMetadata {
 FieldMetadata::default()
 }
}
