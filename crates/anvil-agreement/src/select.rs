//! Algorithm selection rule: chooses Cohen's kappa, Fleiss'
//! kappa, Krippendorff's alpha, or a flagged percent-agreement fallback
//! based on the shape of the ratings gathered for a field.

use anvil_types::entities::AgreementMethod;
use anvil_types::field::FieldType;

use crate::distance::{krippendorff_alpha, percent_agreement, DistanceMetric};
use crate::error::{AgreementError, AgreementResult};
use crate::kappa::{cohen_kappa, fleiss_kappa};
use crate::rating::Rating;

fn distance_metric_for(field_type: FieldType) -> DistanceMetric {
 match field_type {
 FieldType::Select | FieldType::Boolean | FieldType::Text | FieldType::Multiselect => DistanceMetric::Nominal,
 FieldType::Range | FieldType::Number => DistanceMetric::Interval,
 FieldType::Date | FieldType::Datetime => DistanceMetric::Ordinal,
 }
}

/// The outcome of selecting and running an agreement algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct AgreementOutcome {
 pub method: AgreementMethod,
 pub value: f64,
 pub n_raters: u32,
 pub n_labels: u32,
 /// Set when the selection rule fell through to percent agreement
 /// because Krippendorff's alpha was degenerate (no expected
 /// disagreement to normalize against).
 pub flagged: bool,
}

/// Computes agreement for one field across `units`, each unit a sample's
/// per-rater values (`None` for a rater who left the field unanswered).
/// `field_type` drives both the Krippendorff distance metric and the
/// nominal-vs-numeric rating projection.
pub fn compute_field_agreement(units: &[Vec<Option<Rating>>], field_type: FieldType) -> AgreementResult<AgreementOutcome> {
 let n_labels = units.iter().map(|u| u.iter().filter(|r| r.is_some()).count()).sum::<usize>() as u32;
 if n_labels < 2 {
 return Err(AgreementError::InsufficientLabels(n_labels as usize));
 }

 let has_missing = units.iter().any(|u| u.iter().any(|r| r.is_none()));
 let rater_counts: Vec<usize> = units.iter().map(|u| u.len()).collect();
 let uniform_rater_count = rater_counts.windows(2).all(|w| w[0] == w[1]);
 let n_raters = rater_counts.first().copied().unwrap_or(0) as u32;

 if !has_missing && uniform_rater_count && rater_counts.first() == Some(&2) {
 let pairs: Vec<(String, String)> = units
.iter()
.map(|u| (u[0].as_ref().unwrap().as_category_key(), u[1].as_ref().unwrap().as_category_key()))
.collect();
 let value = cohen_kappa(&pairs)?;
 return Ok(AgreementOutcome {
 method: AgreementMethod::Cohen,
 value,
 n_raters,
 n_labels,
 flagged: false,
 });
 }

 if !has_missing && uniform_rater_count && rater_counts.first().map(|n| *n >= 3).unwrap_or(false) {
 let items: Vec<Vec<String>> = units
.iter()
.map(|u| u.iter().map(|r| r.as_ref().unwrap().as_category_key()).collect())
.collect();
 let value = fleiss_kappa(&items)?;
 return Ok(AgreementOutcome {
 method: AgreementMethod::Fleiss,
 value,
 n_raters,
 n_labels,
 flagged: false,
 });
 }

 let present: Vec<Vec<Rating>> = units
.iter()
.map(|u| u.iter().filter_map(|r| r.clone()).collect())
.collect();
 let metric = distance_metric_for(field_type);
 let (value, degenerate) = krippendorff_alpha(&present, metric)?;
 if degenerate {
 let value = percent_agreement(&present)?;
 return Ok(AgreementOutcome {
 method: AgreementMethod::PercentAgreement,
 value,
 n_raters,
 n_labels,
 flagged: true,
 });
 }
 Ok(AgreementOutcome {
 method: AgreementMethod::Krippendorff,
 value,
 n_raters,
 n_labels,
 flagged: false,
 })
}

#[cfg(test)]
mod tests {
 use super::*;

 fn cat(s: &str) -> Option<Rating> {
 Some(Rating::Category(s.to_string()))
 }

 #[test]
 fn two_complete_raters_selects_cohen() {
 let units = vec![
 vec![cat("a"), cat("a")],
 vec![cat("b"), cat("b")],
 vec![cat("a"), cat("b")],
 ];
 let outcome = compute_field_agreement(&units, FieldType::Select).unwrap();
 assert_eq!(outcome.method, AgreementMethod::Cohen);
 }

 #[test]
 fn three_complete_raters_selects_fleiss() {
 let units = vec![
 vec![cat("a"), cat("a"), cat("a")],
 vec![cat("b"), cat("b"), cat("a")],
 ];
 let outcome = compute_field_agreement(&units, FieldType::Select).unwrap();
 assert_eq!(outcome.method, AgreementMethod::Fleiss);
 }

 #[test]
 fn missing_value_selects_krippendorff() {
 let units = vec![vec![cat("a"), None, cat("a")], vec![cat("b"), cat("b"), cat("b")]];
 let outcome = compute_field_agreement(&units, FieldType::Select).unwrap();
 assert_eq!(outcome.method, AgreementMethod::Krippendorff);
 }

 #[test]
 fn mixed_rater_count_selects_krippendorff() {
 let units = vec![vec![cat("a"), cat("a")], vec![cat("b"), cat("b"), cat("b")]];
 let outcome = compute_field_agreement(&units, FieldType::Select).unwrap();
 assert_eq!(outcome.method, AgreementMethod::Krippendorff);
 }

 #[test]
 fn degenerate_alpha_falls_back_to_percent_agreement() {
 let units = vec![vec![cat("a"), None, cat("a")], vec![cat("a"), cat("a"), cat("a")]];
 let outcome = compute_field_agreement(&units, FieldType::Select).unwrap();
 assert_eq!(outcome.method, AgreementMethod::PercentAgreement);
 assert!(outcome.flagged);
 assert_eq!(outcome.value, 1.0);
 }

 #[test]
 fn single_rater_is_insufficient() {
 let units = vec![vec![cat("a")]];
 assert!(compute_field_agreement(&units, FieldType::Select).is_err());
 }
}
