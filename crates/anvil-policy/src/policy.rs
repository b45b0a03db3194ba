//! The composed policy: "a policy is a triple (validators,
//! selector, requeue)". `Policy` is the `Composed` built-in from spec
//! §4.4 made concrete — every queue's policy is one of these, wiring a
//! validator chain, a selector strategy, and a requeue policy together.

use crate::error::PolicyResult;
use crate::requeue::RequeuePolicy;
use crate::selector::{EligibleSample, SelectionContext, Selector};
use crate::validator::{ValidationContext, ValidatorChain};
use anvil_types::SampleId;

pub struct Policy {
 pub validators: ValidatorChain,
 pub selector: Selector,
 pub requeue: RequeuePolicy,
}

impl Policy {
 pub fn new(selector: Selector, requeue: RequeuePolicy) -> Self {
 Self {
 validators: ValidatorChain::standard(),
 selector,
 requeue,
 }
 }

 pub fn with_validators(mut self, validators: ValidatorChain) -> Self {
 self.validators = validators;
 self
 }

 pub fn validate(&self, ctx: &ValidationContext<'_>) -> PolicyResult<()> {
 self.validators.validate(ctx)
 }

 pub fn select(
 &self,
 ctx: &SelectionContext,
 eligible: &[EligibleSample],
 rng: &mut dyn rand::RngCore,
) -> PolicyResult<SampleId> {
 self.selector.select(ctx, eligible, rng)
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::requeue::RequeuePolicy as RQ;
 use anvil_types::entities::{LabelerRole, LabelerStatus};
 use anvil_types::{LabelerId, QueueId, TenantId};
 use chrono::Utc;

 #[test]
 fn composed_policy_validates_then_selects() {
 let policy = Policy::new(Selector::RoundRobin, RQ::requeue(3, 300));
 let labeler = anvil_types::entities::Labeler {
 id: LabelerId::generate(),
 tenant: TenantId::generate(),
 external_id: "ext".into(),
 pseudonym: "labeler_x".into(),
 role: LabelerRole::Labeler,
 status: LabelerStatus::Active,
 expertise_tier: None,
 blocklisted_queues: vec![],
 max_concurrent_assignments: 5,
 };
 let queue_id = QueueId::generate();
 let membership = anvil_types::entities::QueueMembership {
 queue_id,
 labeler_id: labeler.id,
 role: anvil_types::entities::MembershipRole::Labeler,
 granted_at: Utc::now(),
 granted_by: labeler.id,
 expires_at: None,
 revoked_at: None,
 };
 let ctx = ValidationContext {
 labeler: &labeler,
 queue_id,
 membership: Some(&membership),
 in_progress_count: 0,
 now: Utc::now(),
 };
 assert!(policy.validate(&ctx).is_ok());

 let selection_ctx = SelectionContext {
 labeler_id: labeler.id,
 labeler_tier: None,
 labeler_in_progress_count: 0,
 };
 let eligible = vec![EligibleSample {
 id: SampleId::new("s1"),
 created_at: Utc::now(),
 difficulty: None,
 label_count: 0,
 labeled_by: Default::default(),
 }];
 let mut rng = rand::thread_rng();
 let chosen = policy.select(&selection_ctx, &eligible, &mut rng).unwrap();
 assert_eq!(chosen, SampleId::new("s1"));
 }
}
