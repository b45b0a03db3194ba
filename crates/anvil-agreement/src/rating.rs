//! The value a single rater contributed for one field, reduced to the
//! shape the distance functions need. Built from [`anvil_types::FieldValue`]
//! at the call site; this crate never depends on storage or schema types
//! directly so it stays usable from both the online accumulator and a
//! batch recompute.

use anvil_types::field::FieldValue;

/// A rater's value, tagged by which distance function applies to it.
/// `Category` is compared by exact equality (nominal); `Ordered` carries
/// a numeric projection used by both the interval and ordinal distance
/// functions.
#[derive(Debug, Clone, PartialEq)]
pub enum Rating {
 Category(String),
 Ordered(f64),
}

impl Rating {
 /// Projects a field value onto a rating using the field-type-driven
 /// rule from : `select/boolean → nominal`, `range/number →
 /// interval`, `date/datetime → ordinal`.
 pub fn from_field_value(value: &FieldValue) -> Self {
 match value {
 FieldValue::Select(s) => Rating::Category(s.clone()),
 FieldValue::Boolean(b) => Rating::Category(b.to_string()),
 FieldValue::Text(s) => Rating::Category(s.clone()),
 FieldValue::MultiSelect(items) => Rating::Category(items.join(";")),
 FieldValue::Range(n) => Rating::Ordered(*n as f64),
 FieldValue::Number(n) => Rating::Ordered(*n),
 FieldValue::Date(d) => Rating::Ordered(d.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp() as f64),
 FieldValue::DateTime(dt) => Rating::Ordered(dt.timestamp() as f64),
 }
 }

 pub fn as_category_key(&self) -> String {
 match self {
 Rating::Category(s) => s.clone(),
 Rating::Ordered(n) => n.to_bits().to_string(),
 }
 }

 pub fn as_numeric(&self) -> Option<f64> {
 match self {
 Rating::Ordered(n) => Some(*n),
 Rating::Category(_) => None,
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn select_projects_to_category() {
 let v = FieldValue::Select("cat".into());
 assert_eq!(Rating::from_field_value(&v), Rating::Category("cat".into()));
 }

 #[test]
 fn range_projects_to_ordered() {
 let v = FieldValue::Range(3);
 assert_eq!(Rating::from_field_value(&v), Rating::Ordered(3.0));
 }
}
