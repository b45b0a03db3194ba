//! Field-level retention sweep : redacts Label
//! payload fields whose schema declares a finite `retention_days` once
//! they've outlived that window. Grounded on the same
//! `palm-daemon::scheduler` reconciliation shape as the timeout reclaimer
//! — a caller-driven sweep entry point rather than a self-ticking loop.

use std::sync::Arc;

use anvil_audit::record;
use anvil_privacy::redact_value;
use anvil_storage::traits::LabelFilter;
use anvil_storage::Storage;
use anvil_types::entities::{ActorType, Queue, SchemaVersion};
use anvil_types::field::RetentionDays;
use chrono::{Duration, Utc};
use tracing::info;

use crate::error::RetentionResult;

/// Outcome of one [`Retention::sweep`] pass.
#[derive(Debug, Clone, Default)]
pub struct RetentionReport {
 pub fields_redacted: u64,
 pub labels_touched: u64,
}

/// Sweeps Labels under a queue's current schema version, applying each
/// field's `redaction_policy` once that field's `retention_days` window
/// has elapsed since the Label was submitted.
pub struct Retention<S: Storage> {
 storage: Arc<S>,
 /// HMAC/hash salt source for fields with `RedactionPolicy::Hash`.
 /// Rotating this changes every hashed value going forward; existing
 /// hashed values are not retroactively rehashed.
 secret: Vec<u8>,
}

impl<S: Storage> Retention<S> {
 pub fn new(storage: Arc<S>, secret: impl Into<Vec<u8>>) -> Self {
 Self {
 storage,
 secret: secret.into(),
 }
 }

 /// One sweep pass over `queues`, each paired with its active schema
 /// version. There is no `list_queues` on the Storage port, so — like
 /// the timeout reclaimer — the caller supplies the working set.
 pub async fn sweep(
 &self,
 queues_and_schemas: &[(Queue, SchemaVersion)],
) -> RetentionResult<RetentionReport> {
 let now = Utc::now();
 let mut report = RetentionReport::default();

 for (queue, schema) in queues_and_schemas {
 self.sweep_queue(queue, schema, now, &mut report).await?;
 }

 Ok(report)
 }

 async fn sweep_queue(
 &self,
 queue: &Queue,
 schema: &SchemaVersion,
 now: chrono::DateTime<Utc>,
 report: &mut RetentionReport,
) -> RetentionResult<()> {
 let expirable: Vec<_> = schema
.definition
.iter()
.filter_map(|f| match f.metadata.retention_days {
 RetentionDays::Days(days) => Some((f, days)),
 RetentionDays::Indefinite => None,
 })
.collect();
 if expirable.is_empty() {
 return Ok(());
 }

 let labels = self
.storage
.list_labels(
 LabelFilter {
 tenant: Some(queue.tenant),
 queue_id: Some(queue.id),
 schema_version_id: Some(schema.id),
..Default::default()
 },
 anvil_storage::traits::SortOrder::Asc,
 None,
 None,
 false,
)
.await?;

 for mut label in labels {
 let mut touched = false;
 for (field, retention_days) in &expirable {
 if label.redacted_fields.contains(&field.name) {
 continue;
 }
 let expires_at = label.submitted_at + Duration::days(*retention_days as i64);
 if expires_at > now {
 continue;
 }
 let Some(value) = label.payload.get(&field.name) else {
 continue;
 };
 let salt = field_salt(&self.secret, queue, &field.name);
 match redact_value(value, field.metadata.redaction_policy, &salt) {
 Some(redacted) => {
 label.payload.insert(field.name.clone(), redacted);
 }
 None => {
 label.payload.remove(&field.name);
 }
 }
 label.redacted_fields.insert(field.name.clone());
 touched = true;
 report.fields_redacted += 1;
 }

 if !touched {
 continue;
 }

 self.storage.put_label(label.clone()).await?;
 self.storage
.append_audit(record(
 queue.tenant,
 "anvil-retention",
 ActorType::System,
 "retention.field_expired",
 "label",
 label.id.to_string(),
 serde_json::json!({"redacted_fields": label.redacted_fields}),
))
.await?;
 report.labels_touched += 1;
 info!(label_id = %label.id, "applied retention redaction");
 }

 Ok(())
 }
}

fn field_salt(secret: &[u8], queue: &Queue, field_name: &str) -> Vec<u8> {
 let mut salt = Vec::with_capacity(secret.len() + 16 + field_name.len());
 salt.extend_from_slice(secret);
 salt.extend_from_slice(queue.id.as_uuid().as_bytes());
 salt.extend_from_slice(field_name.as_bytes());
 salt
}
