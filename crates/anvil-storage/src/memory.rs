//! In-memory storage, used for tests and single-process development.
//! Every shared map is guarded by its own `RwLock`, mirroring the
//! teacher's `InMemoryStorage` shape rather than one coarse lock.

use crate::error::{StorageError, StorageResult};
use crate::traits::*;
use anvil_types::entities::Assignment;
use anvil_types::{
 AssignmentId, AuditLog, Label, LabelId, LabelerId, Labeler, Queue, QueueId, QueueMembership,
 SampleId, SampleRef, SchemaVersion, SchemaVersionId, TenantId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type SampleKey = (TenantId, SampleId);
type LabelerKey = (TenantId, LabelerId);
type MembershipKey = (QueueId, LabelerId);

#[derive(Debug, Default)]
pub struct InMemoryStorage {
 samples: Arc<RwLock<HashMap<SampleKey, SampleRef>>>,
 assignments: Arc<RwLock<HashMap<AssignmentId, Assignment>>>,
 labels: Arc<RwLock<HashMap<LabelId, Label>>>,
 queues: Arc<RwLock<HashMap<QueueId, Queue>>>,
 schema_versions: Arc<RwLock<HashMap<SchemaVersionId, SchemaVersion>>>,
 labelers: Arc<RwLock<HashMap<LabelerKey, Labeler>>>,
 memberships: Arc<RwLock<HashMap<MembershipKey, QueueMembership>>>,
 audit: Arc<RwLock<Vec<AuditLog>>>,
}

impl InMemoryStorage {
 pub fn new() -> Self {
 Self::default()
 }
}

#[async_trait]
impl SampleRefStore for InMemoryStorage {
 async fn put_sample_ref(&self, sample: SampleRef) -> StorageResult<()> {
 let mut samples = self.samples.write().await;
 samples.insert((sample.tenant, sample.id.clone()), sample);
 Ok(())
 }

 async fn get_sample_ref(
 &self,
 tenant: &TenantId,
 id: &SampleId,
) -> StorageResult<Option<SampleRef>> {
 let samples = self.samples.read().await;
 Ok(samples.get(&(*tenant, id.clone())).cloned())
 }

 async fn list_sample_refs(&self, filter: SampleRefFilter) -> StorageResult<Vec<SampleRef>> {
 let samples = self.samples.read().await;
 let mut matched: Vec<SampleRef> = samples
.values()
.filter(|s| filter.tenant.map_or(true, |t| t == s.tenant))
.filter(|s| filter.queue_id.map_or(true, |q| q == s.queue_id))
.cloned()
.collect();
 matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
 Ok(matched)
 }
}

#[async_trait]
impl AssignmentStore for InMemoryStorage {
 async fn put_assignment(&self, assignment: Assignment) -> StorageResult<()> {
 let mut assignments = self.assignments.write().await;
 assignments.insert(assignment.id, assignment);
 Ok(())
 }

 async fn get_assignment(
 &self,
 tenant: &TenantId,
 id: &AssignmentId,
) -> StorageResult<Option<Assignment>> {
 let assignments = self.assignments.read().await;
 Ok(assignments
.get(id)
.filter(|a| &a.tenant == tenant)
.cloned())
 }

 async fn list_assignments(
 &self,
 filter: AssignmentFilter,
 order_by: AssignmentOrderBy,
 order: SortOrder,
 _for_update_skip_locked: bool,
) -> StorageResult<Vec<Assignment>> {
 // A single write-lock acquisition for the whole call stands in for
 // "select for update skip locked": within one process no other
 // dispatcher can observe or mutate these rows until this guard
 // drops, which is the property the Storage port actually needs
 // (its correctness argument, not literal row locks).
 let assignments = self.assignments.write().await;
 let mut matched: Vec<Assignment> = assignments
.values()
.filter(|a| filter.tenant.map_or(true, |t| t == a.tenant))
.filter(|a| filter.queue_id.map_or(true, |q| q == a.queue_id))
.filter(|a| filter.labeler_id.map_or(true, |l| l == a.labeler_id))
.filter(|a| filter.sample_id.as_ref().map_or(true, |s| s == &a.sample_id))
.filter(|a| filter.status.map_or(true, |s| s == a.status))
.filter(|a| {
 filter
.deadline_before
.map_or(true, |before| a.deadline.map_or(false, |d| d < before))
 })
.cloned()
.collect();

 match order_by {
 AssignmentOrderBy::CreatedAt => matched.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
 AssignmentOrderBy::Deadline => matched.sort_by(|a, b| a.deadline.cmp(&b.deadline)),
 }
 if order == SortOrder::Desc {
 matched.reverse();
 }
 Ok(matched)
 }

 async fn update_assignment_cas(
 &self,
 assignment: Assignment,
 expected_version: u64,
) -> StorageResult<()> {
 let mut assignments = self.assignments.write().await;
 match assignments.get(&assignment.id) {
 None => Err(StorageError::NotFound(format!(
 "assignment {} not found",
 assignment.id
))),
 Some(current) if current.version != expected_version => Err(StorageError::Stale(
 format!("assignment {} has moved on", assignment.id),
)),
 Some(_) => {
 assignments.insert(assignment.id, assignment);
 Ok(())
 }
 }
 }
}

#[async_trait]
impl LabelStore for InMemoryStorage {
 async fn put_label(&self, label: Label) -> StorageResult<()> {
 let mut labels = self.labels.write().await;
 labels.insert(label.id, label);
 Ok(())
 }

 async fn get_label(&self, tenant: &TenantId, id: &LabelId) -> StorageResult<Option<Label>> {
 let labels = self.labels.read().await;
 let found = labels.get(id).cloned();
 if let Some(label) = &found {
 let assignments = self.assignments.read().await;
 if let Some(assignment) = assignments.get(&label.assignment_id) {
 if &assignment.tenant != tenant {
 return Ok(None);
 }
 }
 }
 Ok(found)
 }

 async fn list_labels(
 &self,
 filter: LabelFilter,
 order: SortOrder,
 limit: Option<u64>,
 offset: Option<u64>,
 _stream: bool,
) -> StorageResult<Vec<Label>> {
 let labels = self.labels.read().await;
 let assignments = self.assignments.read().await;
 let mut matched: Vec<(SampleId, Label)> = labels
.values()
.filter(|l| filter.include_deleted || l.deleted_at.is_none())
.filter(|l| {
 filter
.schema_version_id
.map_or(true, |v| v == l.schema_version_id)
 })
.filter_map(|l| {
 let assignment = assignments.get(&l.assignment_id)?;
 let tenant_ok = filter.tenant.map_or(true, |t| assignment.tenant == t);
 let queue_ok = filter.queue_id.map_or(true, |q| assignment.queue_id == q);
 let sample_ok = filter
.sample_id
.as_ref()
.map_or(true, |s| &assignment.sample_id == s);
 (tenant_ok && queue_ok && sample_ok)
.then(|| (assignment.sample_id.clone(), l.clone()))
 })
.collect();

 matched.sort_by(|(sa, a), (sb, b)| {
 sa.cmp(sb)
.then(a.labeler_id.cmp(&b.labeler_id))
.then(a.submitted_at.cmp(&b.submitted_at))
 });
 let mut matched: Vec<Label> = matched.into_iter().map(|(_, l)| l).collect();
 if order == SortOrder::Desc {
 matched.reverse();
 }

 let start = offset.unwrap_or(0) as usize;
 let matched = if start < matched.len() {
 matched.split_off(start)
 } else {
 Vec::new()
 };
 let matched = match limit {
 Some(n) => matched.into_iter().take(n as usize).collect(),
 None => matched,
 };
 Ok(matched)
 }
}

#[async_trait]
impl QueueStore for InMemoryStorage {
 async fn put_queue(&self, queue: Queue) -> StorageResult<()> {
 let mut queues = self.queues.write().await;
 let clashes = queues
.values()
.any(|q| q.tenant == queue.tenant && q.name == queue.name && q.id != queue.id);
 if clashes {
 return Err(StorageError::Conflict(format!(
 "queue name '{}' already exists for tenant",
 queue.name
)));
 }
 queues.insert(queue.id, queue);
 Ok(())
 }

 async fn get_queue(&self, tenant: &TenantId, id: &QueueId) -> StorageResult<Option<Queue>> {
 let queues = self.queues.read().await;
 Ok(queues.get(id).filter(|q| &q.tenant == tenant).cloned())
 }

 async fn get_queue_by_name(
 &self,
 tenant: &TenantId,
 name: &str,
) -> StorageResult<Option<Queue>> {
 let queues = self.queues.read().await;
 Ok(queues
.values()
.find(|q| &q.tenant == tenant && q.name == name)
.cloned())
 }

 async fn list_queues(&self) -> StorageResult<Vec<Queue>> {
 let queues = self.queues.read().await;
 Ok(queues.values().cloned().collect())
 }

 async fn put_schema_version(&self, version: SchemaVersion) -> StorageResult<()> {
 let mut versions = self.schema_versions.write().await;
 if let Some(existing) = versions.get(&version.id) {
 if existing.is_frozen() {
 return Err(StorageError::InvariantViolation(format!(
 "schema version {} is frozen",
 version.id
)));
 }
 }
 versions.insert(version.id, version);
 Ok(())
 }

 async fn get_schema_version(
 &self,
 queue_id: &QueueId,
 id: &SchemaVersionId,
) -> StorageResult<Option<SchemaVersion>> {
 let versions = self.schema_versions.read().await;
 Ok(versions
.get(id)
.filter(|v| &v.queue_id == queue_id)
.cloned())
 }

 async fn list_schema_versions(&self, queue_id: &QueueId) -> StorageResult<Vec<SchemaVersion>> {
 let versions = self.schema_versions.read().await;
 let mut matched: Vec<SchemaVersion> = versions
.values()
.filter(|v| &v.queue_id == queue_id)
.cloned()
.collect();
 matched.sort_by_key(|v| v.version_number);
 Ok(matched)
 }

 async fn freeze_schema_version(
 &self,
 id: &SchemaVersionId,
 at: DateTime<Utc>,
) -> StorageResult<()> {
 let mut versions = self.schema_versions.write().await;
 let version = versions
.get_mut(id)
.ok_or_else(|| StorageError::NotFound(format!("schema version {id} not found")))?;
 if version.frozen_at.is_none() {
 version.frozen_at = Some(at);
 }
 Ok(())
 }
}

#[async_trait]
impl LabelerStore for InMemoryStorage {
 async fn put_labeler(&self, labeler: Labeler) -> StorageResult<()> {
 let mut labelers = self.labelers.write().await;
 labelers.insert((labeler.tenant, labeler.id), labeler);
 Ok(())
 }

 async fn get_labeler(
 &self,
 tenant: &TenantId,
 id: &LabelerId,
) -> StorageResult<Option<Labeler>> {
 let labelers = self.labelers.read().await;
 Ok(labelers.get(&(*tenant, *id)).cloned())
 }

 async fn get_labeler_by_external_id(
 &self,
 tenant: &TenantId,
 external_id: &str,
) -> StorageResult<Option<Labeler>> {
 let labelers = self.labelers.read().await;
 Ok(labelers
.values()
.find(|l| &l.tenant == tenant && l.external_id == external_id)
.cloned())
 }

 async fn put_queue_membership(&self, membership: QueueMembership) -> StorageResult<()> {
 let mut memberships = self.memberships.write().await;
 memberships.insert((membership.queue_id, membership.labeler_id), membership);
 Ok(())
 }

 async fn list_queue_memberships(
 &self,
 labeler_id: &LabelerId,
) -> StorageResult<Vec<QueueMembership>> {
 let memberships = self.memberships.read().await;
 Ok(memberships
.values()
.filter(|m| &m.labeler_id == labeler_id)
.cloned()
.collect())
 }

 async fn get_queue_membership(
 &self,
 queue_id: &QueueId,
 labeler_id: &LabelerId,
) -> StorageResult<Option<QueueMembership>> {
 let memberships = self.memberships.read().await;
 Ok(memberships.get(&(*queue_id, *labeler_id)).cloned())
 }
}

#[async_trait]
impl AuditStore for InMemoryStorage {
 async fn append_audit(&self, entry: AuditLog) -> StorageResult<()> {
 let mut audit = self.audit.write().await;
 audit.push(entry);
 Ok(())
 }

 async fn list_audit(&self, tenant: &TenantId, limit: u64) -> StorageResult<Vec<AuditLog>> {
 let audit = self.audit.read().await;
 Ok(audit
.iter()
.rev()
.filter(|a| &a.tenant == tenant)
.take(limit as usize)
.cloned()
.collect())
 }
}

impl Storage for InMemoryStorage {}

#[cfg(test)]
mod tests {
 use super::*;
 use anvil_types::entities::AssignmentStatus;

 fn sample_assignment(tenant: TenantId, queue_id: QueueId) -> Assignment {
 Assignment {
 id: AssignmentId::generate(),
 queue_id,
 sample_id: SampleId::new("s1"),
 labeler_id: LabelerId::generate(),
 tenant,
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
 }
 }

 #[tokio::test]
 async fn cas_update_rejects_stale_version() {
 let storage = InMemoryStorage::new();
 let tenant = TenantId::generate();
 let queue = QueueId::generate();
 let assignment = sample_assignment(tenant, queue);
 storage.put_assignment(assignment.clone()).await.unwrap();

 let mut next = assignment.clone();
 next.version = 2;
 next.status = AssignmentStatus::InProgress;
 storage.update_assignment_cas(next, 1).await.unwrap();

 let mut stale_attempt = assignment.clone();
 stale_attempt.version = 2;
 let result = storage.update_assignment_cas(stale_attempt, 1).await;
 assert!(matches!(result, Err(StorageError::Stale(_))));
 }

 #[tokio::test]
 async fn queue_name_uniqueness_is_enforced_per_tenant() {
 let storage = InMemoryStorage::new();
 let tenant = TenantId::generate();
 let schema_version = SchemaVersionId::generate();
 let first = Queue {
 id: QueueId::generate(),
 tenant,
 name: "reviews".into(),
 schema_version_id: schema_version,
 status: anvil_types::entities::QueueStatus::Active,
 access_mode: anvil_types::entities::AccessMode::Private,
 labels_per_sample: 1,
 assignment_timeout_secs: 60,
 created_at: Utc::now(),
 };
 storage.put_queue(first.clone()).await.unwrap();

 let mut second = first.clone();
 second.id = QueueId::generate();
 let result = storage.put_queue(second).await;
 assert!(matches!(result, Err(StorageError::Conflict(_))));
 }
}
