//! Timeout sweep: expires overdue `in_progress` assignments and
//! either requeues or archives them per the queue's [`RequeuePolicy`].
//! Grounded on `palm-daemon::scheduler::reconciler`'s `Scheduler` shape,
//! though the sweep body itself has no direct teacher analogue — expiry is
//! Anvil-specific.

use std::sync::Arc;

use anvil_audit::record;
use anvil_policy::RequeuePolicy;
use anvil_storage::traits::{AssignmentFilter, AssignmentOrderBy, SortOrder};
use anvil_storage::{Storage, StorageError};
use anvil_types::entities::{ActorType, Assignment, AssignmentStatus, Queue, QueueStatus};
use anvil_types::AssignmentId;
use chrono::Utc;
use tracing::{info, warn};

use crate::error::ReclaimerResult;

/// Outcome of one [`Reclaimer::sweep`] pass.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
 pub expired: u64,
 pub requeued: u64,
 pub archived: u64,
 /// CAS losers: another process already transitioned the row first.
 /// Not an error; the other writer's outcome wins.
 pub stale_skips: u64,
}

/// Sweeps overdue `in_progress` assignments to `expired`, and any
/// `pending`/`in_progress` assignment under an archived queue straight to
/// `expired` without consulting the requeue policy.
pub struct Reclaimer<S: Storage> {
 storage: Arc<S>,
}

impl<S: Storage> Reclaimer<S> {
 pub fn new(storage: Arc<S>) -> Self {
 Self { storage }
 }

 /// One sweep pass over the supplied queues. There is no
 /// `list_queues` on the Storage port (names no such
 /// operation), so the caller — typically `anvil-daemon`'s scheduler —
 /// is responsible for supplying the set of queues to consider.
 pub async fn sweep(&self, queues: &[Queue], policies: &[(anvil_types::QueueId, RequeuePolicy)]) -> ReclaimerResult<SweepReport> {
 let now = Utc::now();
 let mut report = SweepReport::default();

 for queue in queues {
 if queue.status == QueueStatus::Archived {
 self.expire_all_for_archived_queue(queue, now, &mut report).await?;
 continue;
 }

 let policy = policies
.iter()
.find(|(id, _)| *id == queue.id)
.map(|(_, p)| *p)
.unwrap_or_else(RequeuePolicy::archive_only());

 self.sweep_overdue(queue, policy, now, &mut report).await?;
 }

 Ok(report)
 }

 async fn sweep_overdue(
 &self,
 queue: &Queue,
 policy: RequeuePolicy,
 now: chrono::DateTime<Utc>,
 report: &mut SweepReport,
) -> ReclaimerResult<()> {
 let overdue = self
.storage
.list_assignments(
 AssignmentFilter {
 tenant: Some(queue.tenant),
 queue_id: Some(queue.id),
 status: Some(AssignmentStatus::InProgress),
 deadline_before: Some(now),
..Default::default()
 },
 AssignmentOrderBy::Deadline,
 SortOrder::Asc,
 true,
)
.await?;

 for assignment in overdue {
 self.expire_one(assignment, queue, Some(policy), now, report)
.await?;
 }

 Ok(())
 }

 async fn expire_all_for_archived_queue(
 &self,
 queue: &Queue,
 now: chrono::DateTime<Utc>,
 report: &mut SweepReport,
) -> ReclaimerResult<()> {
 for status in [AssignmentStatus::Pending, AssignmentStatus::InProgress] {
 let rows = self
.storage
.list_assignments(
 AssignmentFilter {
 tenant: Some(queue.tenant),
 queue_id: Some(queue.id),
 status: Some(status),
..Default::default()
 },
 AssignmentOrderBy::CreatedAt,
 SortOrder::Asc,
 true,
)
.await?;
 for assignment in rows {
 // Archived queues never requeue: there is nothing left to
 // dispatch the replacement from.
 self.expire_one(assignment, queue, None, now, report).await?;
 }
 }
 Ok(())
 }

 async fn expire_one(
 &self,
 assignment: Assignment,
 queue: &Queue,
 policy: Option<RequeuePolicy>,
 now: chrono::DateTime<Utc>,
 report: &mut SweepReport,
) -> ReclaimerResult<()> {
 let assignment_id = assignment.id;
 let mut updated = assignment.clone();
 updated.status = AssignmentStatus::Expired;
 updated.expired_at = Some(now);
 updated.version = assignment.version + 1;

 match self
.storage
.update_assignment_cas(updated, assignment.version)
.await
 {
 Ok(()) => {}
 Err(StorageError::Stale(_)) => {
 report.stale_skips += 1;
 return Ok(());
 }
 Err(other) => return Err(other.into()),
 }
 report.expired += 1;

 self.storage
.append_audit(record(
 queue.tenant,
 "anvil-reclaimer",
 ActorType::System,
 "assignment.expired",
 "assignment",
 assignment_id.to_string(),
 serde_json::json!({"queue_id": queue.id.to_string()}),
))
.await?;
 info!(assignment_id = %assignment_id, queue_id = %queue.id, "expired overdue assignment");

 let Some(policy) = policy else {
 self.archive(&assignment, queue, report).await?;
 return Ok(());
 };

 match policy.decide(assignment.requeue_attempts, now) {
 anvil_policy::RequeueDecision::Archive => {
 self.archive(&assignment, queue, report).await?;
 }
 anvil_policy::RequeueDecision::CreatePending {
 not_before,
 allow_same_labeler,
 next_requeue_attempts,
 } => {
 if !allow_same_labeler {
 // Assignment::labeler_id is not optional, so there is
 // no "unassigned pending" row to express "give it to
 // someone else next dispatch". The replacement is
 // still pinned to the original labeler; `not_before`
 // is the only delay lever available here.
 warn!(
 assignment_id = %assignment_id,
 "allow_same_labeler=false has no unassigned-row representation; requeuing to original labeler"
);
 }
 let replacement = Assignment {
 id: AssignmentId::generate(),
 queue_id: queue.id,
 sample_id: assignment.sample_id.clone(),
 labeler_id: assignment.labeler_id,
 tenant: queue.tenant,
 status: AssignmentStatus::Pending,
 version: 1,
 attempts: 0,
 deadline: None,
 reserved_at: None,
 completed_at: None,
 skipped_at: None,
 expired_at: None,
 skip_reason: None,
 label_id: None,
 sample_version: assignment.sample_version.clone(),
 requeue_attempts: next_requeue_attempts,
 not_before,
 created_at: now,
 };
 self.storage.put_assignment(replacement.clone()).await?;
 self.storage
.append_audit(record(
 queue.tenant,
 "anvil-reclaimer",
 ActorType::System,
 "assignment.requeued",
 "assignment",
 replacement.id.to_string(),
 serde_json::json!({"predecessor": assignment_id.to_string()}),
))
.await?;
 report.requeued += 1;
 }
 }

 Ok(())
 }

 async fn archive(
 &self,
 assignment: &Assignment,
 queue: &Queue,
 report: &mut SweepReport,
) -> ReclaimerResult<()> {
 self.storage
.append_audit(record(
 queue.tenant,
 "anvil-reclaimer",
 ActorType::System,
 "assignment.archived",
 "assignment",
 assignment.id.to_string(),
 serde_json::json!({"sample_id": assignment.sample_id.to_string()}),
))
.await?;
 report.archived += 1;
 Ok(())
 }
}
