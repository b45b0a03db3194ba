//! Requeue policy (, consulted by the reclaimer per §4.7): what
//! happens to an assignment's sample after it expires or is otherwise
//! returned to the pool.

use chrono::{DateTime, Duration, Utc};

/// The three requeue behaviors names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueAction {
 /// `:requeue` — create a new `pending` row for the same sample.
 Requeue,
 /// `:archive` — no more attempts; flag for manual review.
 Archive,
 /// `{:requeue_with_priority, n}` — requeue immediately, skipping the
 /// ordinary delay, with priority `n` (not modeled as a stored field;
 /// its sole observable effect here is bypassing `requeue_delay_seconds`).
 RequeueWithPriority(u32),
}

/// A queue's full requeue configuration.
#[derive(Debug, Clone, Copy)]
pub struct RequeuePolicy {
 pub action: RequeueAction,
 pub max_requeue_attempts: u32,
 pub requeue_delay_seconds: u64,
 pub allow_same_labeler: bool,
}

impl RequeuePolicy {
 pub fn archive_only() -> Self {
 Self {
 action: RequeueAction::Archive,
 max_requeue_attempts: 0,
 requeue_delay_seconds: 0,
 allow_same_labeler: true,
 }
 }

 pub fn requeue(max_requeue_attempts: u32, requeue_delay_seconds: u64) -> Self {
 Self {
 action: RequeueAction::Requeue,
 max_requeue_attempts,
 requeue_delay_seconds,
 allow_same_labeler: true,
 }
 }

 /// Decides what to do with a predecessor assignment that just
 /// transitioned to `expired` and had accumulated `requeue_attempts`
 /// prior requeues.
 pub fn decide(&self, requeue_attempts: u32, now: DateTime<Utc>) -> RequeueDecision {
 if matches!(self.action, RequeueAction::Archive) {
 return RequeueDecision::Archive;
 }
 if requeue_attempts >= self.max_requeue_attempts {
 return RequeueDecision::Archive;
 }
 let not_before = match self.action {
 RequeueAction::RequeueWithPriority(_) => None,
 _ => Some(now + Duration::seconds(self.requeue_delay_seconds as i64)),
 };
 RequeueDecision::CreatePending {
 not_before,
 allow_same_labeler: self.allow_same_labeler,
 next_requeue_attempts: requeue_attempts + 1,
 }
 }
}

/// The outcome of [`RequeuePolicy::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequeueDecision {
 CreatePending {
 not_before: Option<DateTime<Utc>>,
 allow_same_labeler: bool,
 next_requeue_attempts: u32,
 },
 Archive,
}
