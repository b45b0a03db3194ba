//! Sample selection strategies. Grounded on 
//! `palm-deployment::strategies` shape: a small enum of strategies an
//! executor dispatches over, rather than an open-ended trait-object
//! registry, since the built-in set is closed and named in this engine.

use anvil_types::entities::DifficultyTier;
use anvil_types::{LabelerId, SampleId};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::BTreeSet;

use crate::error::{PolicyError, PolicyResult};

/// One sample still eligible for assignment within a queue: its label
/// count is below `labels_per_sample` and it has not already been
/// excluded by the coordinator's "not already assigned/completed by this
/// labeler" filter (spec's Eligible sample definition). Selectors apply a
/// second, policy-specific narrowing on top (e.g. Redundancy's
/// `allow_same_labeler`).
#[derive(Debug, Clone)]
pub struct EligibleSample {
 pub id: SampleId,
 pub created_at: DateTime<Utc>,
 pub difficulty: Option<DifficultyTier>,
 pub label_count: u32,
 pub labeled_by: BTreeSet<LabelerId>,
}

/// Per-call context a selector needs about the requesting labeler.
#[derive(Debug, Clone)]
pub struct SelectionContext {
 pub labeler_id: LabelerId,
 pub labeler_tier: Option<DifficultyTier>,
 /// The labeler's own `in_progress` assignment count at selection
 /// time; its WeightedExpertise tie-break orders by this
 /// value, which is necessarily constant across every candidate
 /// sample in a single `select` call — see
 /// [`WeightedExpertise`]'s doc comment.
 pub labeler_in_progress_count: u32,
}

/// Whether a labeler of `tier` is permitted to work on a sample of
/// `difficulty`: a labeler's tier must be at least as senior as the
/// sample's difficulty class.
fn tier_permits(tier: DifficultyTier, difficulty: DifficultyTier) -> bool {
 fn rank(t: DifficultyTier) -> u8 {
 match t {
 DifficultyTier::Simple => 0,
 DifficultyTier::Moderate => 1,
 DifficultyTier::Complex => 2,
 }
 }
 rank(tier) >= rank(difficulty)
}

/// The built-in selection strategies named 
#[derive(Debug, Clone)]
pub enum Selector {
 /// Oldest eligible sample by `created_at`, ties broken by sample id.
 RoundRobin,
 /// Uniform random over the eligible set.
 Random,
 /// Restrict to samples the labeler's tier permits; among those,
 /// order by the labeler's current `in_progress` count ascending, then
 /// random within tier.
 WeightedExpertise,
 /// Prefer the fewest existing labels (under-sampled first); ties
 /// broken by `created_at` ascending.
 Redundancy { allow_same_labeler: bool },
}

impl Selector {
 /// Chooses one sample id from `eligible`, or
 /// [`PolicyError::NoAvailableWork`] if nothing qualifies. `rng` is
 /// only consulted by `Random` and `WeightedExpertise`'s tie-break, so
 /// that `RoundRobin`/`Redundancy` remain deterministic for identical
 /// storage state.
 pub fn select(
 &self,
 ctx: &SelectionContext,
 eligible: &[EligibleSample],
 rng: &mut dyn rand::RngCore,
) -> PolicyResult<SampleId> {
 match self {
 Selector::RoundRobin => Self::round_robin(eligible),
 Selector::Random => Self::random(eligible, rng),
 Selector::WeightedExpertise => Self::weighted_expertise(ctx, eligible, rng),
 Selector::Redundancy { allow_same_labeler } => {
 Self::redundancy(ctx, eligible, *allow_same_labeler)
 }
 }
 }

 fn round_robin(eligible: &[EligibleSample]) -> PolicyResult<SampleId> {
 eligible
.iter()
.min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
.map(|s| s.id.clone())
.ok_or(PolicyError::NoAvailableWork)
 }

 fn random(eligible: &[EligibleSample], rng: &mut dyn rand::RngCore) -> PolicyResult<SampleId> {
 if eligible.is_empty() {
 return Err(PolicyError::NoAvailableWork);
 }
 let index = rng.gen_range(0..eligible.len());
 Ok(eligible[index].id.clone())
 }

 fn weighted_expertise(
 ctx: &SelectionContext,
 eligible: &[EligibleSample],
 rng: &mut dyn rand::RngCore,
) -> PolicyResult<SampleId> {
 let permitted: Vec<&EligibleSample> = eligible
.iter()
.filter(|s| match (ctx.labeler_tier, s.difficulty) {
 (Some(tier), Some(difficulty)) => tier_permits(tier, difficulty),
 // No tier/difficulty recorded: treat as permitted rather
 // than silently excluding untagged samples.
 _ => true,
 })
.collect();
 if permitted.is_empty() {
 return Err(PolicyError::NoAvailableWork);
 }
 // `labeler_in_progress_count` is identical for every candidate in
 // this call (it describes the calling labeler, not the sample),
 // so the ordering names collapses to a random pick
 // within the tier-permitted set.
 let index = rng.gen_range(0..permitted.len());
 Ok(permitted[index].id.clone())
 }

 fn redundancy(
 ctx: &SelectionContext,
 eligible: &[EligibleSample],
 allow_same_labeler: bool,
) -> PolicyResult<SampleId> {
 let candidates: Vec<&EligibleSample> = eligible
.iter()
.filter(|s| allow_same_labeler || !s.labeled_by.contains(&ctx.labeler_id))
.collect();
 candidates
.into_iter()
.min_by(|a, b| a.label_count.cmp(&b.label_count).then(a.created_at.cmp(&b.created_at)))
.map(|s| s.id.clone())
.ok_or(PolicyError::NoAvailableWork)
 }
}
