//! Core entities shared by every Anvil crate.

use crate::field::{Field, FieldValue};
use crate::ids::{
 AssignmentId, LabelId, LabelerId, QueueId, SampleId, SchemaVersionId, TenantId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Lifecycle status of a [`Queue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
 Active,
 Paused,
 Archived,
}

/// Who may request work from a [`Queue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
 Private,
 Restricted,
 Public,
}

/// A named, schema-bound unit of work distribution. Unique on
/// `(tenant, name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Queue {
 pub id: QueueId,
 pub tenant: TenantId,
 pub name: String,
 pub schema_version_id: SchemaVersionId,
 pub status: QueueStatus,
 pub access_mode: AccessMode,
 pub labels_per_sample: u32,
 pub assignment_timeout_secs: u64,
 pub created_at: DateTime<Utc>,
}

impl Queue {
 /// Whether the queue may still accept dispatches and submissions.
 pub fn is_active(&self) -> bool {
 matches!(self.status, QueueStatus::Active)
 }
}

/// One frozen-or-mutable version of a queue's field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaVersion {
 pub id: SchemaVersionId,
 pub queue_id: QueueId,
 pub version_number: u32,
 pub definition: Vec<Field>,
 pub transform_from_previous: Option<TransformRef>,
 pub frozen_at: Option<DateTime<Utc>>,
}

impl SchemaVersion {
 pub fn is_frozen(&self) -> bool {
 self.frozen_at.is_some()
 }

 pub fn field(&self, name: &str) -> Option<&Field> {
 self.definition.iter().find(|f| f.name == name)
 }
}

/// Identifies a registered migration transform by name; the transform
/// implementation itself lives in `anvil-schema`'s transform registry, not
/// in this entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRef {
 pub name: String,
}

/// A weak reference to externally owned sample content, pinned to the
/// version tag observed when an assignment was created. `queue_id` and
/// `created_at` are storage-level additions: the data model 
/// describes the reference itself, but dispatch needs to resolve the set
/// of samples added to a given queue ordered by arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRef {
 pub tenant: TenantId,
 pub queue_id: QueueId,
 pub id: SampleId,
 pub version_tag: String,
 pub metadata: serde_json::Value,
 pub created_at: DateTime<Utc>,
}

/// Lifecycle status of an [`Assignment`]; see the state machine in
/// `anvil-coordinator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
 Pending,
 InProgress,
 Completed,
 Expired,
 Skipped,
}

impl AssignmentStatus {
 pub fn is_terminal(&self) -> bool {
 matches!(
 self,
 AssignmentStatus::Completed | AssignmentStatus::Expired | AssignmentStatus::Skipped
)
 }
}

/// One labeler's claim on one sample within one queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
 pub id: AssignmentId,
 pub queue_id: QueueId,
 pub sample_id: SampleId,
 pub labeler_id: LabelerId,
 pub tenant: TenantId,
 pub status: AssignmentStatus,
 /// Optimistic lock counter. Every successful transition increments
 /// this by one; a write against a stale value fails.
 pub version: u64,
 pub attempts: u32,
 pub deadline: Option<DateTime<Utc>>,
 pub reserved_at: Option<DateTime<Utc>>,
 pub completed_at: Option<DateTime<Utc>>,
 pub skipped_at: Option<DateTime<Utc>>,
 pub expired_at: Option<DateTime<Utc>>,
 pub skip_reason: Option<String>,
 pub label_id: Option<LabelId>,
 pub sample_version: String,
 pub requeue_attempts: u32,
 /// Set by the timeout reclaimer's requeue policy from
 /// `requeue_delay_seconds`; a `pending` row with `not_before > now` is
 /// excluded from dispatch selection until that instant passes.
 pub not_before: Option<DateTime<Utc>>,
 pub created_at: DateTime<Utc>,
}

impl Assignment {
 /// `true` iff the invariants hold for this instance. Used
 /// by property tests rather than on every write (the state machine
 /// enforces these incrementally).
 pub fn invariants_hold(&self) -> bool {
 let deadline_iff_in_progress =
 self.deadline.is_some() == matches!(self.status, AssignmentStatus::InProgress);
 let label_iff_completed =
 self.label_id.is_some() == matches!(self.status, AssignmentStatus::Completed);
 deadline_iff_in_progress && label_iff_completed
 }
}

/// A submitted, schema-validated labeling result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
 pub id: LabelId,
 pub assignment_id: AssignmentId,
 pub labeler_id: LabelerId,
 pub schema_version_id: SchemaVersionId,
 pub payload: BTreeMap<String, FieldValue>,
 pub submitted_at: DateTime<Utc>,
 pub deleted_at: Option<DateTime<Utc>>,
 /// Field names the retention sweeper has already applied the schema's
 /// `redaction_policy` to. Lives outside `payload` itself so the
 /// idempotency marker survives a `Strip` (which removes the payload
 /// entry entirely).
 pub redacted_fields: BTreeSet<String>,
}

/// A labeler's standing within the platform; role and status are enforced
/// tenant-wide, queue membership is enforced per-queue via
/// [`QueueMembership`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelerRole {
 Labeler,
 Reviewer,
 Adjudicator,
 Owner,
 Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelerStatus {
 Active,
 Suspended,
 Deactivated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
 Simple,
 Moderate,
 Complex,
}

/// A human or service principal that can be dispatched work. Unique on
/// `(tenant, external_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labeler {
 pub id: LabelerId,
 pub tenant: TenantId,
 pub external_id: String,
 pub pseudonym: String,
 pub role: LabelerRole,
 pub status: LabelerStatus,
 pub expertise_tier: Option<DifficultyTier>,
 pub blocklisted_queues: Vec<QueueId>,
 pub max_concurrent_assignments: u32,
}

impl Labeler {
 pub fn is_active(&self) -> bool {
 matches!(self.status, LabelerStatus::Active)
 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
 Labeler,
 Reviewer,
 Owner,
}

/// A labeler's grant of access to a specific queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMembership {
 pub queue_id: QueueId,
 pub labeler_id: LabelerId,
 pub role: MembershipRole,
 pub granted_at: DateTime<Utc>,
 pub granted_by: LabelerId,
 pub expires_at: Option<DateTime<Utc>>,
 pub revoked_at: Option<DateTime<Utc>>,
}

impl QueueMembership {
 /// Active iff not revoked and not past expiry, 
 pub fn is_active(&self, now: DateTime<Utc>) -> bool {
 self.revoked_at.is_none() && self.expires_at.map(|exp| exp > now).unwrap_or(true)
 }
}

/// Which chance-corrected agreement statistic produced an
/// [`AgreementMetric`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementMethod {
 Cohen,
 Fleiss,
 Krippendorff,
 PercentAgreement,
}

/// A cached, rebuildable agreement score for one sample and optional
/// field dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementMetric {
 pub sample_id: SampleId,
 pub dimension: Option<String>,
 pub schema_version_id: SchemaVersionId,
 pub metric: AgreementMethod,
 pub value: f64,
 pub n_raters: u32,
 pub n_labels: u32,
 pub computed_at: DateTime<Utc>,
}

/// Actor kind recorded on an [`AuditLog`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
 Labeler,
 Service,
 System,
}

/// Append-only record of a state-changing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
 pub tenant: TenantId,
 pub actor_id: String,
 pub actor_type: ActorType,
 pub action: String,
 pub entity_type: String,
 pub entity_id: String,
 pub metadata: serde_json::Value,
 pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn assignment_invariants_hold_for_pending() {
 let assignment = Assignment {
 id: AssignmentId::generate(),
 queue_id: QueueId::generate(),
 sample_id: SampleId::new("s1"),
 labeler_id: LabelerId::generate(),
 tenant: TenantId::generate(),
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
 sample_version: "v1".into(),
 requeue_attempts: 0,
 not_before: None,
 created_at: Utc::now(),
 };
 assert!(assignment.invariants_hold());
 }

 #[test]
 fn queue_membership_inactive_when_revoked() {
 let now = Utc::now();
 let membership = QueueMembership {
 queue_id: QueueId::generate(),
 labeler_id: LabelerId::generate(),
 role: MembershipRole::Labeler,
 granted_at: now,
 granted_by: LabelerId::generate(),
 expires_at: None,
 revoked_at: Some(now),
 };
 assert!(!membership.is_active(now));
 }
}
