//! The export engine: streams Labels out of Storage as CSV or
//! JSONL, redacting per row, writing atomically, and recording a manifest
//! that makes the run independently reproducible.

pub mod csv;
pub mod error;
pub mod export;
pub mod hashing;

pub use error::{ExportError, ExportResult};
pub use export::{export, ExportRequest};

#[cfg(test)]
mod tests {
 use super::*;
 use anvil_storage::traits::{AssignmentStore, QueueStore};
 use anvil_storage::InMemoryStorage;
 use anvil_types::entities::{AccessMode, Assignment, AssignmentStatus, Label, QueueStatus};
 use anvil_types::field::{Field, FieldMetadata, FieldType, FieldValue, PiiLevel, RedactionPolicy};
 use anvil_types::manifest::{ExportFormat, RedactionMode};
 use anvil_types::{AssignmentId, LabelId, LabelerId, QueueId, SampleId, SchemaVersionId, TenantId};
 use chrono::Utc;
 use std::collections::BTreeMap;
 use std::sync::Arc;

 async fn seeded_storage() -> (Arc<InMemoryStorage>, TenantId, QueueId, SchemaVersionId) {
 let storage = Arc::new(InMemoryStorage::new());
 let tenant = TenantId::generate();
 let queue_id = QueueId::generate();
 let schema_version_id = SchemaVersionId::generate();

 let schema = anvil_types::SchemaVersion {
 id: schema_version_id,
 queue_id,
 version_number: 1,
 definition: vec![
 Field::new("cat", FieldType::Select),
 Field {
 metadata: FieldMetadata {
 pii: PiiLevel::Likely,
 redaction_policy: RedactionPolicy::Hash,
..FieldMetadata::default()
 },
..Field::new("note", FieldType::Text)
 },
 ],
 transform_from_previous: None,
 frozen_at: None,
 };
 storage.put_schema_version(schema).await.unwrap();

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
 storage.put_queue(queue).await.unwrap();

 for (sample, labeler_ord) in [("s1", 1u8), ("s2", 2u8)] {
 let assignment_id = AssignmentId::generate();
 let labeler_id = LabelerId::generate();
 let assignment = Assignment {
 id: assignment_id,
 queue_id,
 sample_id: SampleId::new(sample),
 labeler_id,
 tenant,
 status: AssignmentStatus::Completed,
 version: 2,
 attempts: 1,
 deadline: None,
 reserved_at: Some(Utc::now()),
 completed_at: Some(Utc::now()),
 skipped_at: None,
 expired_at: None,
 skip_reason: None,
 label_id: Some(LabelId::generate()),
 sample_version: "v1".into(),
 requeue_attempts: 0,
 not_before: None,
 created_at: Utc::now(),
 };
 let label_id = assignment.label_id.unwrap();
 storage.put_assignment(assignment).await.unwrap();

 let mut payload = BTreeMap::new();
 payload.insert("cat".to_string(), FieldValue::Select("a".into()));
 payload.insert(
 "note".to_string(),
 FieldValue::Text(format!("note for {sample} by {labeler_ord}")),
);
 let label = Label {
 id: label_id,
 assignment_id,
 labeler_id,
 schema_version_id,
 payload,
 submitted_at: Utc::now(),
 deleted_at: None,
 redacted_fields: Default::default(),
 };
 storage.put_label(label).await.unwrap();
 }

 (storage, tenant, queue_id, schema_version_id)
 }

 fn request(tenant: TenantId, queue_id: QueueId, schema_version_id: SchemaVersionId, path: std::path::PathBuf, format: ExportFormat) -> ExportRequest {
 ExportRequest {
 tenant,
 queue_id,
 schema_version_id: Some(schema_version_id),
 output_path: path,
 format,
 limit: None,
 offset: None,
 filter: serde_json::json!({}),
 redaction_mode: RedactionMode::Automatic,
 secret: b"export-test-secret".to_vec(),
 }
 }

 /// Property P8: identical parameters against identical stored state
 /// produce byte-identical output and an identical hash.
 #[tokio::test]
 async fn export_is_deterministic_across_runs() {
 let (storage, tenant, queue_id, schema_version_id) = seeded_storage().await;
 let dir = tempfile::tempdir.unwrap();

 let path_a = dir.path.join("export_a.csv");
 let (manifest_a, _) = export::export(
 storage.as_ref(),
 request(tenant, queue_id, schema_version_id, path_a.clone(), ExportFormat::Csv),
)
.await
.unwrap();

 let path_b = dir.path.join("export_b.csv");
 let (manifest_b, _) = export::export(
 storage.as_ref(),
 request(tenant, queue_id, schema_version_id, path_b.clone(), ExportFormat::Csv),
)
.await
.unwrap();

 let bytes_a = std::fs::read(&path_a).unwrap();
 let bytes_b = std::fs::read(&path_b).unwrap();
 assert_eq!(bytes_a, bytes_b);
 assert_eq!(manifest_a.sha256_hash, manifest_b.sha256_hash);
 assert_eq!(manifest_a.row_count, 2);
 assert!(!std::path::Path::new(&format!("{}.tmp", path_a.display())).exists());
 }

 #[tokio::test]
 async fn csv_header_and_redaction_are_applied() {
 let (storage, tenant, queue_id, schema_version_id) = seeded_storage().await;
 let dir = tempfile::tempdir.unwrap();
 let path = dir.path.join("export.csv");

 let (_, output_path) = export::export(
 storage.as_ref(),
 request(tenant, queue_id, schema_version_id, path, ExportFormat::Csv),
)
.await
.unwrap();

 let contents = std::fs::read_to_string(&output_path).unwrap();
 let mut lines = contents.lines;
 assert_eq!(lines.next().unwrap(), "sample_id,labeler_id,cat,note,submitted_at");
 let first_row = lines.next().unwrap();
 assert!(first_row.contains("s1"));
 assert!(!first_row.contains("note for s1"));
 }

 #[tokio::test]
 async fn jsonl_rows_carry_the_full_field_set() {
 let (storage, tenant, queue_id, schema_version_id) = seeded_storage().await;
 let dir = tempfile::tempdir.unwrap();
 let path = dir.path.join("export.jsonl");

 let (_, output_path) = export::export(
 storage.as_ref(),
 request(tenant, queue_id, schema_version_id, path, ExportFormat::Jsonl),
)
.await
.unwrap();

 let contents = std::fs::read_to_string(&output_path).unwrap();
 let first_line = contents.lines.next().unwrap();
 let value: serde_json::Value = serde_json::from_str(first_line).unwrap();
 assert!(value["payload"].get("cat").is_some());
 assert!(value["payload"].get("note").is_some());
 }

 #[tokio::test]
 async fn missing_schema_version_id_is_a_hard_error() {
 let (storage, tenant, queue_id, _schema_version_id) = seeded_storage().await;
 let dir = tempfile::tempdir.unwrap();
 let path = dir.path.join("export.csv");

 let mut req = request(tenant, queue_id, SchemaVersionId::generate(), path, ExportFormat::Csv);
 req.schema_version_id = None;

 let result = export::export(storage.as_ref(), req).await;
 assert!(matches!(result, Err(ExportError::InvalidRequest(_))));
 }
}
