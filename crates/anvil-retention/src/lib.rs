//! The field-level retention sweeper : redacts Label
//! payload fields in place once their schema's `retention_days` window has
//! elapsed. Distinct from `anvil-privacy`'s export-time redaction, which
//! never mutates storage.

pub mod error;
pub mod sweep;

pub use error::{RetentionError, RetentionResult};
pub use sweep::{Retention, RetentionReport};

#[cfg(test)]
mod tests {
 use super::*;
 use anvil_storage::traits::QueueStore;
 use anvil_storage::InMemoryStorage;
 use anvil_types::entities::{AccessMode, Label, QueueStatus};
 use anvil_types::field::{Field, FieldMetadata, FieldType, FieldValue, PiiLevel, RedactionPolicy, RetentionDays};
 use anvil_types::{AssignmentId, LabelId, LabelerId, QueueId, SchemaVersionId, TenantId};
 use chrono::{Duration, Utc};
 use std::collections::BTreeMap;
 use std::sync::Arc;

 fn field_with_retention(name: &str, days: u32, policy: RedactionPolicy) -> Field {
 Field {
 metadata: FieldMetadata {
 pii: PiiLevel::Likely,
 retention_days: RetentionDays::Days(days),
 redaction_policy: policy,
 },
..Field::new(name, FieldType::Text)
 }
 }

 async fn setup_label(
 storage: &InMemoryStorage,
 tenant: TenantId,
 queue_id: QueueId,
 schema_version_id: SchemaVersionId,
 submitted_at: chrono::DateTime<Utc>,
) -> Label {
 let mut payload = BTreeMap::new();
 payload.insert("note".to_string(), FieldValue::Text("call me at 555-123-4567".into()));
 payload.insert("cat".to_string(), FieldValue::Text("a".into()));
 let label = Label {
 id: LabelId::generate(),
 assignment_id: AssignmentId::generate(),
 labeler_id: LabelerId::generate(),
 schema_version_id,
 payload,
 submitted_at,
 deleted_at: None,
 redacted_fields: Default::default(),
 };
 storage.put_label(label.clone()).await.unwrap();
 let _ = tenant;
 let _ = queue_id;
 label
 }

 #[tokio::test]
 async fn redacts_fields_past_their_retention_window() {
 let storage = Arc::new(InMemoryStorage::new());
 let tenant = TenantId::generate();
 let queue_id = QueueId::generate();
 let schema_version_id = SchemaVersionId::generate();

 let queue = anvil_types::Queue {
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

 let schema = anvil_types::SchemaVersion {
 id: schema_version_id,
 queue_id,
 version_number: 1,
 definition: vec![
 field_with_retention("note", 30, RedactionPolicy::RegexRedact),
 Field::new("cat", FieldType::Select),
 ],
 transform_from_previous: None,
 frozen_at: None,
 };

 let old_label = setup_label(
 &storage,
 tenant,
 queue_id,
 schema_version_id,
 Utc::now() - Duration::days(31),
)
.await;
 let fresh_label = setup_label(
 &storage,
 tenant,
 queue_id,
 schema_version_id,
 Utc::now(),
)
.await;

 let retention = Retention::new(storage.clone(), b"retention-test-secret".to_vec());
 let report = retention.sweep(&[(queue, schema)]).await.unwrap();

 assert_eq!(report.labels_touched, 1);
 assert_eq!(report.fields_redacted, 1);

 let updated = storage
.get_label(&tenant, &old_label.id)
.await
.unwrap()
.unwrap();
 assert!(updated.redacted_fields.contains("note"));
 if let Some(FieldValue::Text(s)) = updated.payload.get("note") {
 assert!(!s.contains("555-123-4567"));
 } else {
 panic!("expected redacted text field");
 }
 // `cat` has no retention window and is untouched.
 assert_eq!(
 updated.payload.get("cat"),
 Some(&FieldValue::Text("a".into()))
);

 let untouched = storage
.get_label(&tenant, &fresh_label.id)
.await
.unwrap()
.unwrap();
 assert!(untouched.redacted_fields.is_empty());
 }

 #[tokio::test]
 async fn sweep_is_idempotent() {
 let storage = Arc::new(InMemoryStorage::new());
 let tenant = TenantId::generate();
 let queue_id = QueueId::generate();
 let schema_version_id = SchemaVersionId::generate();

 let queue = anvil_types::Queue {
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

 let schema = anvil_types::SchemaVersion {
 id: schema_version_id,
 queue_id,
 version_number: 1,
 definition: vec![field_with_retention("note", 1, RedactionPolicy::Strip)],
 transform_from_previous: None,
 frozen_at: None,
 };

 setup_label(
 &storage,
 tenant,
 queue_id,
 schema_version_id,
 Utc::now() - Duration::days(10),
)
.await;

 let retention = Retention::new(storage.clone(), b"secret".to_vec());
 let first = retention.sweep(&[(queue.clone(), schema.clone())]).await.unwrap();
 assert_eq!(first.labels_touched, 1);

 let second = retention.sweep(&[(queue, schema)]).await.unwrap();
 assert_eq!(second.labels_touched, 0);
 assert_eq!(second.fields_redacted, 0);
 }
}
