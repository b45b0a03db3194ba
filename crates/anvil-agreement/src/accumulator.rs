//! Online agreement mode: on each label submission, update a
//! per-sample accumulator and recompute that sample's metric without
//! rescanning the whole queue.

use std::collections::BTreeMap;

use anvil_types::field::FieldType;
use anvil_types::ids::{LabelerId, SampleId};

use crate::error::AgreementResult;
use crate::rating::Rating;
use crate::select::{compute_field_agreement, AgreementOutcome};

/// Per-(sample, field) running tally of every rater's value, keyed so a
/// new submission is an upsert rather than a rebuild. Keyed by
/// `LabelerId` order (not a `HashMap`) so that [`recompute`]'s unit
/// vectors line up the same rater at the same position across every
/// sample's independently-built accumulator.
#[derive(Debug, Clone, Default)]
pub struct AgreementAccumulator {
 ratings: BTreeMap<LabelerId, Rating>,
}

impl AgreementAccumulator {
 pub fn new() -> Self {
 Self::default()
 }

 /// Records or overwrites `labeler`'s value. Per, Label
 /// submission ordering is storage's insertion order; the accumulator
 /// only keeps the latest value per labeler, matching "per-sample
 /// metric" semantics rather than a full submission history.
 pub fn record(&mut self, labeler: LabelerId, rating: Rating) {
 self.ratings.insert(labeler, rating);
 }

 pub fn rater_count(&self) -> usize {
 self.ratings.len()
 }

 /// Recomputes this sample's metric against every other sample's
 /// accumulator for the same field, since Cohen's/Fleiss'/Krippendorff's
 /// all need more than one unit to estimate chance agreement.
 pub fn recompute(&self, peers: &[&AgreementAccumulator], field_type: FieldType) -> AgreementResult<AgreementOutcome> {
 let mut units: Vec<Vec<Option<Rating>>> = Vec::with_capacity(peers.len() + 1);
 units.push(self.ratings.values().cloned().map(Some).collect());
 for peer in peers {
 units.push(peer.ratings.values().cloned().map(Some).collect());
 }
 compute_field_agreement(&units, field_type)
 }
}

/// Keys an accumulator by the sample and field dimension it tracks.
pub type AccumulatorKey = (SampleId, Option<String>);

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn record_upserts_by_labeler() {
 let mut acc = AgreementAccumulator::new();
 let labeler = LabelerId::generate();
 acc.record(labeler, Rating::Category("a".into()));
 acc.record(labeler, Rating::Category("b".into()));
 assert_eq!(acc.rater_count(), 1);
 }

 #[test]
 fn recompute_combines_with_peers() {
 let mut a = AgreementAccumulator::new();
 a.record(LabelerId::generate(), Rating::Category("x".into()));
 a.record(LabelerId::generate(), Rating::Category("x".into()));

 let mut b = AgreementAccumulator::new();
 b.record(LabelerId::generate(), Rating::Category("y".into()));
 b.record(LabelerId::generate(), Rating::Category("y".into()));

 let outcome = a.recompute(&[&b], FieldType::Select).unwrap();
 assert!((outcome.value - 1.0).abs() < 1e-9);
 }
}
