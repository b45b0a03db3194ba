//! Batch recompute mode: given every label already on disk
//! for a queue's field, recompute that field's agreement metric from
//! scratch. Idempotent — running it twice over unchanged storage produces
//! the same outcome.

use anvil_types::field::FieldType;
use anvil_types::ids::SampleId;

use crate::error::AgreementResult;
use crate::rating::Rating;
use crate::select::{compute_field_agreement, AgreementOutcome};

/// One sample's ratings for the field under recompute.
pub struct SampleRatings {
 pub sample_id: SampleId,
 pub ratings: Vec<Option<Rating>>,
}

/// Recomputes agreement across every sample in `samples`, then checks the
/// result against `low_score_threshold` for the `agreement.low_score`
/// alerting hook. Returns the outcome plus whether it should be alerted on.
pub fn recompute_queue_field(
 samples: &[SampleRatings],
 field_type: FieldType,
 low_score_threshold: f64,
) -> AgreementResult<(AgreementOutcome, bool)> {
 let units: Vec<Vec<Option<Rating>>> = samples.iter().map(|s| s.ratings.clone()).collect();
 let outcome = compute_field_agreement(&units, field_type)?;
 let should_alert = outcome.value < low_score_threshold;
 Ok((outcome, should_alert))
}

#[cfg(test)]
mod tests {
 use super::*;

 fn cat(s: &str) -> Option<Rating> {
 Some(Rating::Category(s.to_string()))
 }

 #[test]
 fn recompute_is_idempotent() {
 let samples = vec![
 SampleRatings {
 sample_id: SampleId::new("s1"),
 ratings: vec![cat("a"), cat("a")],
 },
 SampleRatings {
 sample_id: SampleId::new("s2"),
 ratings: vec![cat("b"), cat("b")],
 },
 ];
 let (first, _) = recompute_queue_field(&samples, FieldType::Select, 0.5).unwrap();
 let (second, _) = recompute_queue_field(&samples, FieldType::Select, 0.5).unwrap();
 assert_eq!(first, second);
 }

 #[test]
 fn low_score_flag_trips_below_threshold() {
 let samples = vec![
 SampleRatings {
 sample_id: SampleId::new("s1"),
 ratings: vec![cat("a"), cat("b")],
 },
 SampleRatings {
 sample_id: SampleId::new("s2"),
 ratings: vec![cat("b"), cat("a")],
 },
 ];
 let (_, alerted) = recompute_queue_field(&samples, FieldType::Select, 0.9).unwrap();
 assert!(alerted);
 }
}
