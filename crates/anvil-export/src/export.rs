//! The export engine: paginated read from Storage, per-row
//! redaction, RFC-4180 CSV or JSONL emission, atomic write-then-rename,
//! streamed SHA-256, and a manifest recording exactly how the file was
//! produced. Grounded on `maple-storage`'s `QueryWindow` pagination shape;
//! the write-temp/hash/rename sequence itself has no teacher analogue.

use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anvil_privacy::redact_value;
use anvil_storage::traits::{LabelFilter, SortOrder};
use anvil_storage::Storage;
use anvil_types::field::{Field, FieldValue, PiiLevel, RedactionPolicy};
use anvil_types::manifest::{ExportFormat, ExportManifest, ExportParameters, RedactionMode};
use anvil_types::{ExportId, QueueId, SchemaVersionId, TenantId};
use chrono::Utc;

use crate::csv::write_row as csv_write_row;
use crate::error::{ExportError, ExportResult};
use crate::hashing::HashingWriter;

const CHUNK_SIZE: u64 = 1000;
const ANVIL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parameters for one export run. `schema_version_id` is `Option` to model
/// the "missing schema_version_id is a hard error" requirement as a
/// value that can actually be absent at the API boundary.
pub struct ExportRequest {
 pub tenant: TenantId,
 pub queue_id: QueueId,
 pub schema_version_id: Option<SchemaVersionId>,
 pub output_path: PathBuf,
 pub format: ExportFormat,
 pub limit: Option<u64>,
 pub offset: Option<u64>,
 pub filter: serde_json::Value,
 pub redaction_mode: RedactionMode,
 /// Salt source for `RedactionPolicy::Hash` fields; irrelevant under
 /// `RedactionMode::None`.
 pub secret: Vec<u8>,
}

/// Runs one export: opens `<output_path>.tmp`, streams matching labels in
/// `CHUNK_SIZE` pages ordered `sample_id, labeler_id, submitted_at`,
/// renames to `output_path` on success, and writes the manifest alongside
/// it. On any failure the temp file is removed and no partial final file
/// is ever visible.
pub async fn export<S: Storage>(
 storage: &S,
 request: ExportRequest,
) -> ExportResult<(ExportManifest, PathBuf)> {
 let schema_version_id = request
.schema_version_id
.ok_or_else(|| ExportError::InvalidRequest("schema_version_id is required".into()))?;

 let schema = storage
.get_schema_version(&request.queue_id, &schema_version_id)
.await?
.ok_or_else(|| {
 ExportError::InvalidRequest(format!("schema version {schema_version_id} not found"))
 })?;

 let schema_definition_hash = hash_definition(&schema.definition)?;

 let mut field_names: Vec<String> = schema.definition.iter().map(|f| f.name.clone()).collect();
 field_names.sort();
 let fields_by_name: BTreeMap<&str, &Field> =
 schema.definition.iter().map(|f| (f.name.as_str(), f)).collect();

 let tmp_path = tmp_path_for(&request.output_path);
 let result = run(
 storage,
 &request,
 schema_version_id,
 &field_names,
 &fields_by_name,
 &tmp_path,
)
.await;

 let (row_count, sha256_hash) = match result {
 Ok(outcome) => outcome,
 Err(err) => {
 let _ = std::fs::remove_file(&tmp_path);
 return Err(err);
 }
 };

 std::fs::rename(&tmp_path, &request.output_path)?;

 let mut rng = rand::thread_rng();
 let export_id = ExportId::generate(Utc::now().timestamp_millis().max(0) as u64, &mut rng);
 let manifest = ExportManifest {
 export_id,
 queue_id: request.queue_id,
 schema_version_id,
 sample_version: None,
 format: request.format,
 output_path: request.output_path.display().to_string(),
 row_count,
 sha256_hash,
 exported_at: Utc::now(),
 parameters: ExportParameters {
 limit: request.limit,
 offset: request.offset,
 filter: request.filter.clone(),
 redaction_mode: request.redaction_mode,
 },
 anvil_version: ANVIL_VERSION.to_string(),
 schema_definition_hash: Some(schema_definition_hash),
 };

 let manifest_path = manifest_path_for(&request.output_path);
 let manifest_bytes = serde_json::to_vec_pretty(&manifest)
.map_err(|e| ExportError::InvalidRequest(e.to_string()))?;
 std::fs::write(&manifest_path, manifest_bytes)?;

 Ok((manifest, request.output_path.clone()))
}

async fn run<S: Storage>(
 storage: &S,
 request: &ExportRequest,
 schema_version_id: SchemaVersionId,
 field_names: &[String],
 fields_by_name: &BTreeMap<&str, &Field>,
 tmp_path: &Path,
) -> ExportResult<(u64, String)> {
 let file = std::fs::File::create(tmp_path)?;
 let mut writer = HashingWriter::new(BufWriter::new(file));

 if request.format == ExportFormat::Csv {
 let mut header: Vec<&str> = vec!["sample_id", "labeler_id"];
 header.extend(field_names.iter().map(|s| s.as_str()));
 header.push("submitted_at");
 writer.write_all(csv_write_row(&header).as_bytes())?;
 }

 let mut row_count: u64 = 0;
 let mut cursor = request.offset.unwrap_or(0);
 let mut remaining = request.limit;

 loop {
 let take = match remaining {
 Some(0) => break,
 Some(r) => r.min(CHUNK_SIZE),
 None => CHUNK_SIZE,
 };

 let page = storage
.list_labels(
 LabelFilter {
 tenant: Some(request.tenant),
 queue_id: Some(request.queue_id),
 schema_version_id: Some(schema_version_id),
..Default::default()
 },
 SortOrder::Asc,
 Some(take),
 Some(cursor),
 true,
)
.await?;
 if page.is_empty() {
 break;
 }
 let got = page.len() as u64;

 for label in &page {
 let assignment = storage
.get_assignment(&request.tenant, &label.assignment_id)
.await?
.ok_or_else(|| {
 ExportError::InvalidRequest(format!(
 "assignment {} referenced by label {} not found",
 label.assignment_id, label.id
))
 })?;

 let redacted: BTreeMap<String, Option<FieldValue>> = field_names
.iter()
.map(|name| {
 let value = label.payload.get(name);
 let rendered = value.and_then(|v| {
 let field = fields_by_name.get(name.as_str());
 let policy = field
.map(|f| effective_policy(f, request.redaction_mode))
.unwrap_or(RedactionPolicy::Preserve);
 let salt = field_salt(&request.secret, name);
 redact_value(v, policy, &salt)
 });
 (name.clone(), rendered)
 })
.collect();

 match request.format {
 ExportFormat::Csv => {
 let mut row: Vec<String> =
 vec![assignment.sample_id.to_string(), label.labeler_id.to_string()];
 for name in field_names {
 row.push(
 redacted
.get(name)
.and_then(|v| v.as_ref())
.map(|v| v.to_export_string())
.unwrap_or_default(),
);
 }
 row.push(label.submitted_at.to_rfc3339());
 let refs: Vec<&str> = row.iter().map(|s| s.as_str()).collect();
 writer.write_all(csv_write_row(&refs).as_bytes())?;
 }
 ExportFormat::Jsonl => {
 let mut payload = serde_json::Map::new();
 for name in field_names {
 let value = redacted
.get(name)
.and_then(|v| v.as_ref())
.map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null))
.unwrap_or(serde_json::Value::Null);
 payload.insert(name.clone(), value);
 }
 let row = serde_json::json!({
 "sample_id": assignment.sample_id.to_string(),
 "labeler_id": label.labeler_id.to_string(),
 "payload": payload,
 "submitted_at": label.submitted_at.to_rfc3339(),
 "metadata": {},
 });
 writer.write_all(row.to_string().as_bytes())?;
 writer.write_all(b"\n")?;
 }
 }
 row_count += 1;
 }

 cursor += got;
 if let Some(r) = remaining.as_mut() {
 *r -= got;
 }
 if got < take {
 break;
 }
 }

 writer.flush()?;
 Ok((row_count, writer.finalize_hex()))
}

/// `RedactionMode::Automatic` applies the field's declared policy as-is.
/// `RedactionMode::Aggressive` never weakens it but escalates to at least
/// the strength implied by the field's `pii` level, for callers who want a
/// stronger floor than whatever the schema happened to declare.
/// `RedactionMode::None` bypasses redaction entirely.
fn effective_policy(field: &Field, mode: RedactionMode) -> RedactionPolicy {
 match mode {
 RedactionMode::None => RedactionPolicy::Preserve,
 RedactionMode::Automatic => field.metadata.redaction_policy,
 RedactionMode::Aggressive => {
 let implied = pii_implied_policy(field.metadata.pii);
 if policy_strength(implied) > policy_strength(field.metadata.redaction_policy) {
 implied
 } else {
 field.metadata.redaction_policy
 }
 }
 }
}

fn pii_implied_policy(pii: PiiLevel) -> RedactionPolicy {
 match pii {
 PiiLevel::None => RedactionPolicy::Preserve,
 PiiLevel::Possible => RedactionPolicy::RegexRedact,
 PiiLevel::Likely => RedactionPolicy::Hash,
 PiiLevel::Definite => RedactionPolicy::Strip,
 }
}

fn policy_strength(policy: RedactionPolicy) -> u8 {
 match policy {
 RedactionPolicy::Preserve => 0,
 RedactionPolicy::Truncate => 1,
 RedactionPolicy::RegexRedact => 2,
 RedactionPolicy::Hash => 3,
 RedactionPolicy::Strip => 4,
 }
}

fn field_salt(secret: &[u8], field_name: &str) -> Vec<u8> {
 let mut salt = Vec::with_capacity(secret.len() + field_name.len());
 salt.extend_from_slice(secret);
 salt.extend_from_slice(field_name.as_bytes());
 salt
}

fn hash_definition(definition: &[Field]) -> ExportResult<String> {
 use sha2::{Digest, Sha256};
 let bytes = serde_json::to_vec(definition).map_err(|e| ExportError::InvalidRequest(e.to_string()))?;
 let mut hasher = Sha256::new();
 hasher.update(&bytes);
 Ok(hex::encode(hasher.finalize()))
}

fn tmp_path_for(output_path: &Path) -> PathBuf {
 let mut s = output_path.as_os_str().to_os_string();
 s.push(".tmp");
 PathBuf::from(s)
}

fn manifest_path_for(output_path: &Path) -> PathBuf {
 let mut s = output_path.as_os_str().to_os_string();
 s.push(".manifest.json");
 PathBuf::from(s)
}
