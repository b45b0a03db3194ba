//! Export manifest entity, matching the wire format pinned 

use crate::ids::{ExportId, QueueId, SchemaVersionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
 Csv,
 Jsonl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionMode {
 None,
 Automatic,
 Aggressive,
}

/// The `parameters` object of an export manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportParameters {
 pub limit: Option<u64>,
 pub offset: Option<u64>,
 pub filter: serde_json::Value,
 pub redaction_mode: RedactionMode,
}

/// Emitted alongside every export, recording exactly how it was produced
/// so the output can be independently verified or reproduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
 pub export_id: ExportId,
 pub queue_id: QueueId,
 pub schema_version_id: SchemaVersionId,
 pub sample_version: Option<String>,
 pub format: ExportFormat,
 pub output_path: String,
 pub row_count: u64,
 pub sha256_hash: String,
 pub exported_at: DateTime<Utc>,
 pub parameters: ExportParameters,
 pub anvil_version: String,
 pub schema_definition_hash: Option<String>,
}
