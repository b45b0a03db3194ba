//! Export-time field redaction. Applied to a copy of a
//! label's payload at read time; never mutates storage (the storage-level
//! counterpart lives in `anvil-retention`).

use anvil_types::field::{FieldValue, RedactionPolicy};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

const DEFAULT_TRUNCATE_LEN: usize = 100;

/// Default PII patterns applied by `regex_redact` when the caller doesn't
/// supply its own set: email, US SSN, phone, and credit-card-shaped runs
/// of digits.
fn default_patterns() -> &'static [Regex] {
 static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
 PATTERNS.get_or_init(|| {
 vec![
 Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
 Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
 Regex::new(r"\b(\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap(),
 Regex::new(r"\b(?:\d[ -]*?){13,16}\b").unwrap(),
 ]
 })
}

/// Replaces every match of every pattern in `text` with `[REDACTED]`.
fn apply_patterns(text: &str, patterns: &[Regex]) -> String {
 let mut out = text.to_string();
 for pattern in patterns {
 out = pattern.replace_all(&out, "[REDACTED]").into_owned();
 }
 out
}

/// Applies `policy` to `value`, returning `None` when the field should be
/// omitted entirely (`strip`).
pub fn redact_value(value: &FieldValue, policy: RedactionPolicy, salt: &[u8]) -> Option<FieldValue> {
 redact_value_with_patterns(value, policy, salt, None)
}

/// Same as [`redact_value`] but lets the caller override the default
/// `regex_redact` pattern set.
pub fn redact_value_with_patterns(
 value: &FieldValue,
 policy: RedactionPolicy,
 salt: &[u8],
 patterns: Option<&[Regex]>,
) -> Option<FieldValue> {
 match policy {
 RedactionPolicy::Preserve => Some(value.clone()),
 RedactionPolicy::Strip => None,
 RedactionPolicy::Truncate => Some(truncate_value(value, DEFAULT_TRUNCATE_LEN)),
 RedactionPolicy::Hash => Some(hash_value(value, salt)),
 RedactionPolicy::RegexRedact => {
 let patterns = patterns.unwrap_or_else(|| default_patterns());
 Some(regex_redact_value(value, patterns))
 }
 }
}

fn truncate_value(value: &FieldValue, max_len: usize) -> FieldValue {
 match value {
 FieldValue::Text(s) => FieldValue::Text(truncate_str(s, max_len)),
 FieldValue::Select(s) => FieldValue::Select(truncate_str(s, max_len)),
 FieldValue::MultiSelect(items) => {
 FieldValue::MultiSelect(items.iter().map(|s| truncate_str(s, max_len)).collect())
 }
 other => other.clone(),
 }
}

fn truncate_str(s: &str, max_len: usize) -> String {
 s.chars().take(max_len).collect()
}

fn hash_value(value: &FieldValue, salt: &[u8]) -> FieldValue {
 let rendered = value.to_export_string();
 let mut hasher = Sha256::new();
 hasher.update(salt);
 hasher.update(rendered.as_bytes());
 let digest = hasher.finalize();
 FieldValue::Text(hex::encode(digest))
}

fn regex_redact_value(value: &FieldValue, patterns: &[Regex]) -> FieldValue {
 match value {
 FieldValue::Text(s) => FieldValue::Text(apply_patterns(s, patterns)),
 FieldValue::Select(s) => FieldValue::Select(apply_patterns(s, patterns)),
 FieldValue::MultiSelect(items) => {
 FieldValue::MultiSelect(items.iter().map(|s| apply_patterns(s, patterns)).collect())
 }
 other => other.clone(),
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn strip_omits_the_field() {
 let value = FieldValue::Text("secret".into());
 assert!(redact_value(&value, RedactionPolicy::Strip, b"salt").is_none());
 }

 #[test]
 fn preserve_is_identity() {
 let value = FieldValue::Text("keep me".into());
 assert_eq!(
 redact_value(&value, RedactionPolicy::Preserve, b"salt"),
 Some(value)
);
 }

 #[test]
 fn hash_preserves_grouping() {
 let a = FieldValue::Text("same-value".into());
 let b = FieldValue::Text("same-value".into());
 let ha = redact_value(&a, RedactionPolicy::Hash, b"salt").unwrap();
 let hb = redact_value(&b, RedactionPolicy::Hash, b"salt").unwrap();
 assert_eq!(ha, hb);
 }

 #[test]
 fn hash_differs_with_different_salt() {
 let value = FieldValue::Text("value".into());
 let h1 = redact_value(&value, RedactionPolicy::Hash, b"salt1").unwrap();
 let h2 = redact_value(&value, RedactionPolicy::Hash, b"salt2").unwrap();
 assert_ne!(h1, h2);
 }

 #[test]
 fn truncate_limits_text_length() {
 let value = FieldValue::Text("a".repeat(200));
 let truncated = redact_value(&value, RedactionPolicy::Truncate, b"salt").unwrap();
 if let FieldValue::Text(s) = truncated {
 assert_eq!(s.len(), 100);
 } else {
 panic!("expected text");
 }
 }

 #[test]
 fn regex_redact_masks_email() {
 let value = FieldValue::Text("contact me at jane.doe@example.com please".into());
 let redacted = redact_value(&value, RedactionPolicy::RegexRedact, b"salt").unwrap();
 if let FieldValue::Text(s) = redacted {
 assert!(!s.contains("jane.doe@example.com"));
 assert!(s.contains("[REDACTED]"));
 } else {
 panic!("expected text");
 }
 }

 #[test]
 fn non_string_values_pass_through_text_only_policies() {
 let value = FieldValue::Boolean(true);
 assert_eq!(
 redact_value(&value, RedactionPolicy::RegexRedact, b"salt"),
 Some(FieldValue::Boolean(true))
);
 }
}
