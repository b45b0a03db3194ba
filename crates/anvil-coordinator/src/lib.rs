//! The assignment state machine and queue coordinator:
//! `dispatch_next`, `submit_label`, and `skip`, each one transaction
//! against the Storage port, ACL-checked and audited.

pub mod coordinator;
pub mod error;
pub mod state;

pub use coordinator::QueueCoordinator;
pub use error::{CoordinatorError, CoordinatorResult};
pub use state::can_transition;

#[cfg(test)]
mod tests {
 use super::*;
 use anvil_acl::AclError;
 use anvil_audit::telemetry::TracingTelemetry;
 use anvil_policy::{Policy, RequeuePolicy, Selector};
 use anvil_storage::InMemoryStorage;
 use anvil_storage::traits::{AssignmentStore, LabelerStore, QueueStore, SampleRefStore};
 use anvil_types::entities::{
 AccessMode, DifficultyTier, LabelerRole, LabelerStatus, MembershipRole, QueueMembership,
 QueueStatus,
 };
 use anvil_types::field::{Field, FieldType};
 use anvil_types::{Labeler, LabelerId, Queue, QueueId, SampleId, SampleRef, SchemaVersion, SchemaVersionId, TenantId};
 use anvil_sample_provider::DirectProvider;
 use chrono::Utc;
 use std::collections::BTreeSet;
 use std::sync::Arc;

 fn options(values: &[&str]) -> BTreeSet<String> {
 values.iter().map(|v| v.to_string()).collect()
 }

 async fn setup() -> (
 QueueCoordinator<InMemoryStorage, DirectProvider<InMemoryStorage>, TracingTelemetry>,
 Arc<InMemoryStorage>,
 Queue,
 Labeler,
) {
 let storage = Arc::new(InMemoryStorage::new());
 let tenant = TenantId::generate();

 let schema_version_id = SchemaVersionId::generate();
 let queue_id = QueueId::generate();
 let schema = SchemaVersion {
 id: schema_version_id,
 queue_id,
 version_number: 1,
 definition: vec![Field {
 required: true,
 options: Some(options(&["a", "b", "c"])),
..Field::new("cat", FieldType::Select)
 }],
 transform_from_previous: None,
 frozen_at: None,
 };
 storage.put_schema_version(schema).await.unwrap();

 let queue = Queue {
 id: queue_id,
 tenant,
 name: "q1".into(),
 schema_version_id,
 status: QueueStatus::Active,
 access_mode: AccessMode::Restricted,
 labels_per_sample: 1,
 assignment_timeout_secs: 60,
 created_at: Utc::now(),
 };
 storage.put_queue(queue.clone()).await.unwrap();

 storage
.put_sample_ref(SampleRef {
 tenant,
 queue_id,
 id: SampleId::new("s1"),
 version_tag: "v1".into(),
 metadata: serde_json::json!({}),
 created_at: Utc::now(),
 })
.await
.unwrap();

 let labeler = Labeler {
 id: LabelerId::generate(),
 tenant,
 external_id: "ext-l1".into(),
 pseudonym: "labeler_l1".into(),
 role: LabelerRole::Labeler,
 status: LabelerStatus::Active,
 expertise_tier: Some(DifficultyTier::Moderate),
 blocklisted_queues: vec![],
 max_concurrent_assignments: 5,
 };
 storage.put_labeler(labeler.clone()).await.unwrap();
 storage
.put_queue_membership(QueueMembership {
 queue_id,
 labeler_id: labeler.id,
 role: MembershipRole::Labeler,
 granted_at: Utc::now(),
 granted_by: labeler.id,
 expires_at: None,
 revoked_at: None,
 })
.await
.unwrap();

 let provider = Arc::new(DirectProvider::new(storage.clone()));
 let policy = Policy::new(Selector::RoundRobin, RequeuePolicy::requeue(3, 60));
 let coordinator = QueueCoordinator::new(storage.clone(), provider, Arc::new(TracingTelemetry), policy);
 (coordinator, storage, queue, labeler)
 }

 /// Scenario 1 (round-trip submission): dispatch, submit, exhaust.
 #[tokio::test]
 async fn round_trip_submission_exhausts_the_queue() {
 let (coordinator, _storage, queue, labeler) = setup().await;

 let assignment = coordinator.dispatch_next(&queue, &labeler).await.unwrap();
 assert_eq!(assignment.status, anvil_types::entities::AssignmentStatus::Pending);
 assert_eq!(assignment.sample_id, SampleId::new("s1"));

 let mut payload = serde_json::Map::new();
 payload.insert("cat".into(), serde_json::Value::String("a".into()));

 // pending -> completed is not a direct transition; must reserve first.
 let err = coordinator
.submit_label(assignment.id, &labeler, payload.clone())
.await;
 assert!(err.is_err());

 // Reserve via the single allowed pending -> in_progress edge, then submit.
 let reserved = coordinator.start(assignment.id, &labeler).await.unwrap();
 assert_eq!(reserved.status, anvil_types::entities::AssignmentStatus::InProgress);

 let label = coordinator
.submit_label(assignment.id, &labeler, payload)
.await
.unwrap();
 assert_eq!(label.assignment_id, assignment.id);

 let result = coordinator.dispatch_next(&queue, &labeler).await;
 assert!(matches!(
 result,
 Err(CoordinatorError::Policy(anvil_policy::PolicyError::NoAvailableWork))
));
 }

 /// Scenario 6 (cross-tenant isolation): a labeler from a different
 /// tenant is forbidden and no assignment row is written.
 #[tokio::test]
 async fn cross_tenant_dispatch_is_forbidden() {
 let (coordinator, storage, queue, _labeler) = setup().await;

 let other_tenant = TenantId::generate();
 let intruder = Labeler {
 id: LabelerId::generate(),
 tenant: other_tenant,
 external_id: "ext-intruder".into(),
 pseudonym: "labeler_intruder".into(),
 role: LabelerRole::Labeler,
 status: LabelerStatus::Active,
 expertise_tier: None,
 blocklisted_queues: vec![],
 max_concurrent_assignments: 5,
 };

 let result = coordinator.dispatch_next(&queue, &intruder).await;
 assert!(matches!(
 result,
 Err(CoordinatorError::Acl(AclError::TenantMismatch))
));

 let assignments = storage
.list_assignments(
 Default::default(),
 anvil_storage::traits::AssignmentOrderBy::CreatedAt,
 anvil_storage::traits::SortOrder::Asc,
 false,
)
.await
.unwrap();
 assert!(assignments.is_empty());
 }

 struct RecordingTelemetry {
 events: std::sync::Mutex<Vec<anvil_audit::TelemetryEvent>>,
 }

 impl RecordingTelemetry {
 fn new() -> Self {
 Self { events: std::sync::Mutex::new(Vec::new()) }
 }

 fn names(&self) -> Vec<String> {
 self.events.lock().unwrap().iter().map(|e| e.name.clone()).collect()
 }
 }

 impl anvil_audit::Telemetry for RecordingTelemetry {
 fn emit(&self, event: anvil_audit::TelemetryEvent) {
 self.events.lock().unwrap().push(event);
 }
 }

 /// Scenario 5-ish (agreement selection, online mode): two labelers
 /// who consistently disagree on the same field across two samples
 /// trip the `agreement.low_score` hook as each submission lands.
 #[tokio::test]
 async fn submitting_disagreeing_labels_emits_low_score_event() {
 let storage = Arc::new(InMemoryStorage::new());
 let tenant = TenantId::generate();
 let queue_id = QueueId::generate();
 let schema_version_id = SchemaVersionId::generate();

 let schema = SchemaVersion {
 id: schema_version_id,
 queue_id,
 version_number: 1,
 definition: vec![Field {
 required: true,
 options: Some(options(&["a", "b"])),
..Field::new("cat", FieldType::Select)
 }],
 transform_from_previous: None,
 frozen_at: None,
 };
 storage.put_schema_version(schema).await.unwrap();

 let queue = Queue {
 id: queue_id,
 tenant,
 name: "q1".into(),
 schema_version_id,
 status: QueueStatus::Active,
 access_mode: AccessMode::Restricted,
 labels_per_sample: 2,
 assignment_timeout_secs: 60,
 created_at: Utc::now(),
 };
 storage.put_queue(queue.clone()).await.unwrap();

 for (name, offset) in [("s1", 0), ("s2", 1)] {
 storage
.put_sample_ref(SampleRef {
 tenant,
 queue_id,
 id: SampleId::new(name),
 version_tag: "v1".into(),
 metadata: serde_json::json!({}),
 created_at: Utc::now() + chrono::Duration::milliseconds(offset),
 })
.await
.unwrap();
 }

 let mut labelers = Vec::new();
 for ext in ["ext-l1", "ext-l2"] {
 let labeler = Labeler {
 id: LabelerId::generate(),
 tenant,
 external_id: ext.into(),
 pseudonym: format!("labeler_{ext}"),
 role: LabelerRole::Labeler,
 status: LabelerStatus::Active,
 expertise_tier: None,
 blocklisted_queues: vec![],
 max_concurrent_assignments: 5,
 };
 storage.put_labeler(labeler.clone()).await.unwrap();
 storage
.put_queue_membership(QueueMembership {
 queue_id,
 labeler_id: labeler.id,
 role: MembershipRole::Labeler,
 granted_at: Utc::now(),
 granted_by: labeler.id,
 expires_at: None,
 revoked_at: None,
})
.await
.unwrap();
 labelers.push(labeler);
 }

 let provider = Arc::new(DirectProvider::new(storage.clone()));
 let telemetry = Arc::new(RecordingTelemetry::new());
 let policy = Policy::new(Selector::RoundRobin, RequeuePolicy::requeue(3, 60));
 let coordinator = QueueCoordinator::new(storage.clone(), provider, telemetry.clone(), policy);

 let answers = ["a", "b"];
 for labeler in &labelers {
 for _ in 0..2 {
 let assignment = coordinator.dispatch_next(&queue, labeler).await.unwrap();
 coordinator.start(assignment.id, labeler).await.unwrap();
 let mut payload = serde_json::Map::new();
 let who = if labeler.external_id == "ext-l1" { 0 } else { 1 };
 payload.insert("cat".into(), serde_json::Value::String(answers[who].into()));
 coordinator.submit_label(assignment.id, labeler, payload).await.unwrap();
 }
 }

 assert!(telemetry.names().iter().any(|n| n == "anvil.agreement.low_score"));
 }
}
