//! Pre-selection validators. Grounded on 
//! `palm-policy::gate` trait-object chain with `FirstDenyWins` semantics:
//! a validator chain short-circuits at the first rejection rather than
//! collecting every reason.

use anvil_types::entities::{Labeler, QueueMembership};
use anvil_types::QueueId;
use chrono::{DateTime, Utc};

use crate::error::{PolicyError, PolicyResult};

/// Everything a validator needs to decide whether a labeler may be
/// dispatched work from a queue.
pub struct ValidationContext<'a> {
 pub labeler: &'a Labeler,
 pub queue_id: QueueId,
 pub membership: Option<&'a QueueMembership>,
 /// Count of the labeler's assignments currently `in_progress` across
 /// the whole tenant (its `max_concurrent_exceeded`).
 pub in_progress_count: u32,
 pub now: DateTime<Utc>,
}

/// One pre-selection check. Implementations must be side-effect free:
/// validators only read state passed in [`ValidationContext`].
pub trait Validator: Send + Sync {
 fn validate(&self, ctx: &ValidationContext<'_>) -> PolicyResult<()>;

 fn name(&self) -> &'static str;
}

/// Rejects a labeler who is in `blocklisted_queues` or whose queue
/// membership is absent, revoked, or expired.
#[derive(Debug, Default)]
pub struct BlockedValidator;

impl Validator for BlockedValidator {
 fn validate(&self, ctx: &ValidationContext<'_>) -> PolicyResult<()> {
 if ctx.labeler.blocklisted_queues.contains(&ctx.queue_id) {
 return Err(PolicyError::Blocked);
 }
 match ctx.membership {
 Some(membership) if membership.is_active(ctx.now) => Ok(()),
 _ => Err(PolicyError::Blocked),
 }
 }

 fn name(&self) -> &'static str {
 "blocked"
 }
}

/// Rejects a labeler who already has `>= max_concurrent_assignments`
/// assignments `in_progress`.
#[derive(Debug, Default)]
pub struct MaxConcurrentValidator;

impl Validator for MaxConcurrentValidator {
 fn validate(&self, ctx: &ValidationContext<'_>) -> PolicyResult<()> {
 if ctx.in_progress_count >= ctx.labeler.max_concurrent_assignments {
 return Err(PolicyError::MaxConcurrentExceeded);
 }
 Ok(())
 }

 fn name(&self) -> &'static str {
 "max_concurrent"
 }
}

/// Runs a sequence of validators, short-circuiting on the first
/// rejection, matching `FirstDenyWins` evaluation mode.
pub struct ValidatorChain {
 validators: Vec<Box<dyn Validator>>,
}

impl ValidatorChain {
 pub fn new() -> Self {
 Self { validators: Vec::new() }
 }

 /// The cha names: block check, then concurrency check.
 pub fn standard() -> Self {
 Self::new()
.with(Box::new(BlockedValidator))
.with(Box::new(MaxConcurrentValidator))
 }

 pub fn with(mut self, validator: Box<dyn Validator>) -> Self {
 self.validators.push(validator);
 self
 }

 pub fn validate(&self, ctx: &ValidationContext<'_>) -> PolicyResult<()> {
 for validator in &self.validators {
 validator.validate(ctx)?;
 }
 Ok(())
 }
}

impl Default for ValidatorChain {
 fn default() -> Self {
 Self::standard()
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use anvil_types::entities::{LabelerRole, LabelerStatus, MembershipRole};
 use anvil_types::{LabelerId, TenantId};

 fn labeler(blocklisted: Vec<QueueId>, max_concurrent: u32) -> Labeler {
 Labeler {
 id: LabelerId::generate(),
 tenant: TenantId::generate(),
 external_id: "ext".into(),
 pseudonym: "labeler_abc".into(),
 role: LabelerRole::Labeler,
 status: LabelerStatus::Active,
 expertise_tier: None,
 blocklisted_queues: blocklisted,
 max_concurrent_assignments: max_concurrent,
 }
 }

 fn active_membership(queue_id: QueueId, labeler_id: LabelerId) -> QueueMembership {
 QueueMembership {
 queue_id,
 labeler_id,
 role: MembershipRole::Labeler,
 granted_at: Utc::now(),
 granted_by: labeler_id,
 expires_at: None,
 revoked_at: None,
 }
 }

 #[test]
 fn blocklisted_queue_rejects() {
 let queue_id = QueueId::generate();
 let labeler = labeler(vec![queue_id], 5);
 let membership = active_membership(queue_id, labeler.id);
 let ctx = ValidationContext {
 labeler: &labeler,
 queue_id,
 membership: Some(&membership),
 in_progress_count: 0,
 now: Utc::now(),
 };
 assert_eq!(
 BlockedValidator.validate(&ctx),
 Err(PolicyError::Blocked)
);
 }

 #[test]
 fn max_concurrent_rejects_at_limit() {
 let queue_id = QueueId::generate();
 let labeler = labeler(vec![], 2);
 let ctx = ValidationContext {
 labeler: &labeler,
 queue_id,
 membership: None,
 in_progress_count: 2,
 now: Utc::now(),
 };
 assert_eq!(
 MaxConcurrentValidator.validate(&ctx),
 Err(PolicyError::MaxConcurrentExceeded)
);
 }

 #[test]
 fn chain_short_circuits_on_first_failure() {
 let queue_id = QueueId::generate();
 let labeler = labeler(vec![queue_id], 1);
 let ctx = ValidationContext {
 labeler: &labeler,
 queue_id,
 membership: None,
 in_progress_count: 5,
 now: Utc::now(),
 };
 let chain = ValidatorChain::standard();
 assert_eq!(chain.validate(&ctx), Err(PolicyError::Blocked));
 }
}
