//! The queue coordinator: `dispatch_next`, `submit_label`, and
//! `skip`, each a single async entry point performing one logical
//! transaction against the Storage port. Grounded on `palm-daemon::server`'s
//! "one handler function per write operation" shape.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use anvil_acl::{authorize, Capability};
use anvil_agreement::{qualitative_band, AgreementAccumulator, Rating};
use anvil_audit::{record, Telemetry, TelemetryEvent};
use anvil_policy::{EligibleSample, Policy, SelectionContext, ValidationContext};
use anvil_sample_provider::SampleProvider;
use anvil_storage::traits::{AssignmentFilter, AssignmentOrderBy, SampleRefFilter, SortOrder};
use anvil_storage::Storage;
use anvil_types::entities::{
 ActorType, Assignment, AssignmentStatus, DifficultyTier, Label, Queue, SchemaVersion,
};
use anvil_types::{AssignmentId, Labeler, LabelerId, SampleId};
use chrono::Utc;
use dashmap::DashMap;
use tracing::{info, warn};

use crate::error::{CoordinatorError, CoordinatorResult};
use crate::state::can_transition;

/// Default threshold below which the online agreement recompute
/// (§4.8) emits `anvil.agreement.low_score`. Overridable via
/// [`QueueCoordinator::with_agreement_threshold`].
const DEFAULT_LOW_SCORE_THRESHOLD: f64 = 0.4;

/// Ties storage, the sample provider port, the policy triple, and the
/// telemetry sink together for one queue-serving process. Multiple queues
/// may share one coordinator instance; the optimistic-lock Storage column
/// is what actually keeps concurrent dispatches safe, not any
/// in-process lock here.
pub struct QueueCoordinator<S, P, T>
where
 S: Storage,
 P: SampleProvider,
 T: Telemetry,
{
 storage: Arc<S>,
 sample_provider: Arc<P>,
 telemetry: Arc<T>,
 policy: Policy,
 /// Online agreement accumulators (§4.8), keyed by `(sample, field
 /// name)`. Best-effort and rebuildable from Storage, per §5's
 /// shared-resource policy — losing this map loses no authoritative
 /// state, only the in-process low-score alerting until the next batch
 /// recompute.
 agreement: DashMap<(SampleId, String), AgreementAccumulator>,
 agreement_low_score_threshold: f64,
}

fn parse_difficulty(metadata: &serde_json::Value) -> Option<DifficultyTier> {
 match metadata.get("difficulty").and_then(|v| v.as_str()) {
 Some("simple") => Some(DifficultyTier::Simple),
 Some("moderate") => Some(DifficultyTier::Moderate),
 Some("complex") => Some(DifficultyTier::Complex),
 _ => None,
 }
}

impl<S, P, T> QueueCoordinator<S, P, T>
where
 S: Storage,
 P: SampleProvider,
 T: Telemetry,
{
 pub fn new(storage: Arc<S>, sample_provider: Arc<P>, telemetry: Arc<T>, policy: Policy) -> Self {
 Self {
 storage,
 sample_provider,
 telemetry,
 policy,
 agreement: DashMap::new(),
 agreement_low_score_threshold: DEFAULT_LOW_SCORE_THRESHOLD,
 }
 }

 pub fn with_agreement_threshold(mut self, threshold: f64) -> Self {
 self.agreement_low_score_threshold = threshold;
 self
 }

 /// dispatch_next: ACL check, run validators, resolve eligible samples,
 /// select one, pin the sample's version, insert a fresh `pending`
 /// Assignment.
 pub async fn dispatch_next(
 &self,
 queue: &Queue,
 caller: &Labeler,
) -> CoordinatorResult<Assignment> {
 let now = Utc::now();

 if anvil_acl::check_tenant(caller, queue).is_err() {
 self.audit_denied(caller, queue, "dispatch_next").await;
 return Err(anvil_acl::AclError::TenantMismatch.into());
 }

 let membership = self
.storage
.get_queue_membership(&queue.id, &caller.id)
.await?;
 authorize(
 caller,
 queue,
 membership.as_ref(),
 Capability::RequestAssignment,
 now,
)?;

 let in_progress_count = self
.storage
.list_assignments(
 AssignmentFilter {
 tenant: Some(caller.tenant),
 labeler_id: Some(caller.id),
 status: Some(AssignmentStatus::InProgress),
..Default::default()
 },
 AssignmentOrderBy::CreatedAt,
 SortOrder::Asc,
 false,
)
.await?
.len() as u32;

 self.policy.validate(&ValidationContext {
 labeler: caller,
 queue_id: queue.id,
 membership: membership.as_ref(),
 in_progress_count,
 now,
 })?;

 let eligible = self.eligible_samples(queue, caller.id, now).await?;

 let selection_ctx = SelectionContext {
 labeler_id: caller.id,
 labeler_tier: caller.expertise_tier,
 labeler_in_progress_count: in_progress_count,
 };
 let mut rng = rand::thread_rng();
 let sample_id = self.policy.select(&selection_ctx, &eligible, &mut rng)?;

 let sample_dto = self.sample_provider.fetch(&queue.tenant, &sample_id).await?;

 let assignment = Assignment {
 id: AssignmentId::generate(),
 queue_id: queue.id,
 sample_id: sample_id.clone(),
 labeler_id: caller.id,
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
 sample_version: sample_dto.version,
 requeue_attempts: 0,
 not_before: None,
 created_at: now,
 };
 self.storage.put_assignment(assignment.clone()).await?;

 self.storage
.append_audit(record(
 queue.tenant,
 caller.id.to_string(),
 ActorType::Labeler,
 "assignment.created",
 "assignment",
 assignment.id.to_string(),
 serde_json::json!({"queue_id": queue.id.to_string(), "sample_id": sample_id.to_string()}),
))
.await?;
 self.telemetry.emit(
 TelemetryEvent::new("anvil.dispatch.assigned")
.with_metadata("queue_id", queue.id.to_string())
.with_metadata("labeler_id", caller.id.to_string()),
);
 info!(assignment_id = %assignment.id, queue_id = %queue.id, "dispatched assignment");

 Ok(assignment)
 }

 /// Builds the eligible-sample set for `labeler`: samples whose label
 /// count is below `labels_per_sample`, excluding any sample the labeler
 /// already holds an active (non-future, non-terminal) assignment for or
 /// has already completed. A `pending` row with `not_before` still in
 /// the future does not count as "currently reserving" (spec comment on
 /// `Assignment::not_before`).
 async fn eligible_samples(
 &self,
 queue: &Queue,
 labeler_id: LabelerId,
 now: chrono::DateTime<Utc>,
) -> CoordinatorResult<Vec<EligibleSample>> {
 let sample_refs = self
.storage
.list_sample_refs(SampleRefFilter {
 tenant: Some(queue.tenant),
 queue_id: Some(queue.id),
 })
.await?;

 let assignments = self
.storage
.list_assignments(
 AssignmentFilter {
 tenant: Some(queue.tenant),
 queue_id: Some(queue.id),
..Default::default()
 },
 AssignmentOrderBy::CreatedAt,
 SortOrder::Asc,
 false,
)
.await?;

 let mut label_counts: HashMap<SampleId, u32> = HashMap::new();
 let mut labeled_by: HashMap<SampleId, BTreeSet<LabelerId>> = HashMap::new();
 let mut excluded: BTreeSet<SampleId> = BTreeSet::new();

 for assignment in &assignments {
 if assignment.status == AssignmentStatus::Completed {
 *label_counts.entry(assignment.sample_id.clone()).or_insert(0) += 1;
 labeled_by
.entry(assignment.sample_id.clone())
.or_default()
.insert(assignment.labeler_id);
 if assignment.labeler_id == labeler_id {
 excluded.insert(assignment.sample_id.clone());
 }
 continue;
 }
 let is_reserving = matches!(
 assignment.status,
 AssignmentStatus::Pending | AssignmentStatus::InProgress
) && assignment.not_before.map(|nb| nb <= now).unwrap_or(true);
 if assignment.labeler_id == labeler_id && is_reserving {
 excluded.insert(assignment.sample_id.clone());
 }
 }

 let eligible = sample_refs
.into_iter()
.filter(|s| {
 let count = label_counts.get(&s.id).copied().unwrap_or(0);
 count < queue.labels_per_sample && !excluded.contains(&s.id)
 })
.map(|s| EligibleSample {
 difficulty: parse_difficulty(&s.metadata),
 label_count: label_counts.get(&s.id).copied().unwrap_or(0),
 labeled_by: labeled_by.get(&s.id).cloned().unwrap_or_default(),
 created_at: s.created_at,
 id: s.id,
 })
.collect();

 Ok(eligible)
 }

 /// its `pending -> in_progress` edge: the labeler claims a
 /// dispatched assignment, starting its deadline clock. Not one of the
 /// three contracts §4.5 names explicitly, but required by the state
 /// table and by property P1 — every assignment that reaches `completed`
 /// or `in_progress -> skipped` passes through here first.
 pub async fn start(
 &self,
 assignment_id: AssignmentId,
 caller: &Labeler,
) -> CoordinatorResult<Assignment> {
 let now = Utc::now();

 let assignment = self
.storage
.get_assignment(&caller.tenant, &assignment_id)
.await?
.ok_or_else(|| CoordinatorError::NotFound(format!("assignment {assignment_id}")))?;

 if assignment.labeler_id != caller.id {
 return Err(anvil_acl::AclError::Forbidden(
 "caller is not the assigned labeler".into(),
)
.into());
 }
 if !can_transition(assignment.status, AssignmentStatus::InProgress) {
 return Err(CoordinatorError::InvalidTransition {
 from: format!("{:?}", assignment.status),
 to: "InProgress".into(),
 });
 }
 if let Some(not_before) = assignment.not_before {
 if not_before > now {
 return Err(anvil_acl::AclError::Forbidden(
 "assignment is not yet eligible for claim".into(),
)
.into());
 }
 }

 let queue = self
.storage
.get_queue(&caller.tenant, &assignment.queue_id)
.await?
.ok_or_else(|| CoordinatorError::NotFound(format!("queue {}", assignment.queue_id)))?;
 let membership = self
.storage
.get_queue_membership(&queue.id, &caller.id)
.await?;
 authorize(caller, &queue, membership.as_ref(), Capability::Submit, now)?;

 let mut updated = assignment.clone();
 updated.status = AssignmentStatus::InProgress;
 updated.reserved_at = Some(now);
 updated.deadline = Some(now + chrono::Duration::seconds(queue.assignment_timeout_secs as i64));
 updated.attempts += 1;
 updated.version = assignment.version + 1;
 self.storage
.update_assignment_cas(updated.clone(), assignment.version)
.await?;

 self.storage
.append_audit(record(
 queue.tenant,
 caller.id.to_string(),
 ActorType::Labeler,
 "assignment.started",
 "assignment",
 assignment_id.to_string(),
 serde_json::json!({}),
))
.await?;

 Ok(updated)
 }

 /// submit_label: load assignment, ownership check, schema validation,
 /// write Label, freeze the SchemaVersion on first write, transition the
 /// assignment to `completed`. Unknown payload fields are dropped, not
 /// rejected.
 pub async fn submit_label(
 &self,
 assignment_id: AssignmentId,
 caller: &Labeler,
 payload: serde_json::Map<String, serde_json::Value>,
) -> CoordinatorResult<Label> {
 let now = Utc::now();

 let assignment = self
.storage
.get_assignment(&caller.tenant, &assignment_id)
.await?
.ok_or_else(|| CoordinatorError::NotFound(format!("assignment {assignment_id}")))?;

 if assignment.labeler_id != caller.id {
 return Err(anvil_acl::AclError::Forbidden(
 "caller is not the assigned labeler".into(),
)
.into());
 }
 if !can_transition(assignment.status, AssignmentStatus::Completed) {
 return Err(CoordinatorError::InvalidTransition {
 from: format!("{:?}", assignment.status),
 to: "Completed".into(),
 });
 }

 let queue = self
.storage
.get_queue(&caller.tenant, &assignment.queue_id)
.await?
.ok_or_else(|| CoordinatorError::NotFound(format!("queue {}", assignment.queue_id)))?;
 let membership = self
.storage
.get_queue_membership(&queue.id, &caller.id)
.await?;
 authorize(caller, &queue, membership.as_ref(), Capability::Submit, now)?;

 let schema_version = self
.storage
.get_schema_version(&queue.id, &queue.schema_version_id)
.await?
.ok_or_else(|| {
 CoordinatorError::NotFound(format!("schema version {}", queue.schema_version_id))
 })?;

 let normalized = anvil_schema::validate_payload(&schema_version, &payload)
.map_err(CoordinatorError::ValidationFailed)?;

 let label = Label {
 id: anvil_types::LabelId::generate(),
 assignment_id,
 labeler_id: caller.id,
 schema_version_id: schema_version.id,
 payload: normalized,
 submitted_at: now,
 deleted_at: None,
 redacted_fields: std::collections::BTreeSet::new(),
 };
 self.storage.put_label(label.clone()).await?;
 self.storage
.freeze_schema_version(&schema_version.id, now)
.await?;

 let mut updated = assignment.clone();
 updated.status = AssignmentStatus::Completed;
 updated.label_id = Some(label.id);
 updated.completed_at = Some(now);
 updated.version = assignment.version + 1;
 self.storage
.update_assignment_cas(updated, assignment.version)
.await?;

 self.storage
.append_audit(record(
 queue.tenant,
 caller.id.to_string(),
 ActorType::Labeler,
 "assignment.completed",
 "assignment",
 assignment_id.to_string(),
 serde_json::json!({"label_id": label.id.to_string()}),
))
.await?;
 self.telemetry.emit(
 TelemetryEvent::new("anvil.submit.completed")
.with_metadata("assignment_id", assignment_id.to_string()),
);

 self.record_online_agreement(&schema_version, assignment.sample_id, &label);

 Ok(label)
 }

 /// record_online_agreement: on each label submission, upsert the
 /// per-(sample, field) accumulator and recompute that sample's metric
 /// against every peer sample already accumulated for the same field. A
 /// value below `agreement_low_score_threshold` emits the
 /// `agreement.low_score` alerting hook. Best-effort: errors (most
 /// commonly `insufficient_labels`, a non-error result per §7) never
 /// fail the submission that triggered them.
 fn record_online_agreement(&self, schema_version: &SchemaVersion, sample_id: SampleId, label: &Label) {
 for field in &schema_version.definition {
 let Some(value) = label.payload.get(&field.name) else {
 continue;
 };
 let rating = Rating::from_field_value(value);
 let key = (sample_id.clone(), field.name.clone());
 self.agreement
.entry(key.clone())
.or_insert_with(AgreementAccumulator::new)
.record(label.labeler_id, rating);

 let peers: Vec<_> = self
.agreement
.iter()
.filter(|entry| entry.key().1 == field.name && entry.key().0 != sample_id)
.map(|entry| entry.value().clone())
.collect();
 let peer_refs: Vec<&AgreementAccumulator> = peers.iter().collect();

 let outcome = {
 let acc = self.agreement.get(&key).expect("just inserted");
 acc.recompute(&peer_refs, field.field_type)
 };

 match outcome {
 Ok(outcome) => {
 if outcome.value < self.agreement_low_score_threshold {
 self.telemetry.emit(
 TelemetryEvent::new("anvil.agreement.low_score")
.with_metadata("sample_id", sample_id.to_string())
.with_metadata("field", field.name.clone())
.with_metadata("band", qualitative_band(outcome.value))
.with_measurement("value", outcome.value),
);
 }
 }
 Err(anvil_agreement::AgreementError::InsufficientLabels(_)) => {}
 Err(err) => {
 warn!(field = %field.name, %sample_id, error = %err, "online agreement recompute failed");
 }
 }
 }
 }

 /// skip: `pending -> skipped` or `in_progress -> skipped`,
 /// ownership-checked.
 pub async fn skip(
 &self,
 assignment_id: AssignmentId,
 caller: &Labeler,
 reason: Option<String>,
) -> CoordinatorResult<Assignment> {
 let now = Utc::now();

 let assignment = self
.storage
.get_assignment(&caller.tenant, &assignment_id)
.await?
.ok_or_else(|| CoordinatorError::NotFound(format!("assignment {assignment_id}")))?;

 if assignment.labeler_id != caller.id {
 return Err(anvil_acl::AclError::Forbidden(
 "caller is not the assigned labeler".into(),
)
.into());
 }
 if !can_transition(assignment.status, AssignmentStatus::Skipped) {
 return Err(CoordinatorError::InvalidTransition {
 from: format!("{:?}", assignment.status),
 to: "Skipped".into(),
 });
 }

 let queue = self
.storage
.get_queue(&caller.tenant, &assignment.queue_id)
.await?
.ok_or_else(|| CoordinatorError::NotFound(format!("queue {}", assignment.queue_id)))?;
 let membership = self
.storage
.get_queue_membership(&queue.id, &caller.id)
.await?;
 authorize(caller, &queue, membership.as_ref(), Capability::Skip, now)?;

 let mut updated = assignment.clone();
 updated.status = AssignmentStatus::Skipped;
 updated.skipped_at = Some(now);
 updated.skip_reason = reason;
 updated.version = assignment.version + 1;
 self.storage
.update_assignment_cas(updated.clone(), assignment.version)
.await?;

 self.storage
.append_audit(record(
 queue.tenant,
 caller.id.to_string(),
 ActorType::Labeler,
 "assignment.skipped",
 "assignment",
 assignment_id.to_string(),
 serde_json::json!({}),
))
.await?;

 Ok(updated)
 }

 async fn audit_denied(&self, caller: &Labeler, queue: &Queue, action: &str) {
 let _ = self
.storage
.append_audit(record(
 caller.tenant,
 caller.id.to_string(),
 ActorType::Labeler,
 "access_denied",
 "queue",
 queue.id.to_string(),
 serde_json::json!({"attempted_action": action}),
))
.await;
 }
}
