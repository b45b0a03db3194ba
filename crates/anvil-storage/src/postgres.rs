//! Postgres-backed storage adapter. Feature-gated behind `postgres`
//! (workspace default keeps `sqlx` optional, matching 
//! `maple-storage` crate layout).

use crate::error::{StorageError, StorageResult};
use crate::traits::*;
use anvil_types::entities::{Assignment, AssignmentStatus};
use anvil_types::{
 AssignmentId, AuditLog, Label, LabelId, LabelerId, Labeler, Queue, QueueId, QueueMembership,
 SampleId, SampleRef, SchemaVersion, SchemaVersionId, TenantId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

/// Durable storage over Postgres. Connects lazily; callers are expected
/// to run [`PostgresStorage::init_schema`] once at startup, mirroring
/// `PostgresMapleStorage::connect` + `init_schema`.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
 pool: PgPool,
}

impl PostgresStorage {
 pub async fn connect(database_url: &str) -> StorageResult<Self> {
 let pool = PgPoolOptions::new()
.max_connections(10)
.connect(database_url)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(Self { pool })
 }

 pub fn from_pool(pool: PgPool) -> Self {
 Self { pool }
 }

 /// Idempotent schema bootstrap; safe to call on every startup.
 pub async fn init_schema(&self) -> StorageResult<()> {
 sqlx::query(
 r#"
 CREATE TABLE IF NOT EXISTS anvil_queues (
 id UUID PRIMARY KEY,
 tenant UUID NOT NULL,
 name TEXT NOT NULL,
 schema_version_id UUID NOT NULL,
 status TEXT NOT NULL,
 access_mode TEXT NOT NULL,
 labels_per_sample INTEGER NOT NULL,
 assignment_timeout_secs BIGINT NOT NULL,
 created_at TIMESTAMPTZ NOT NULL,
 UNIQUE (tenant, name)
);

 CREATE TABLE IF NOT EXISTS anvil_schema_versions (
 id UUID PRIMARY KEY,
 queue_id UUID NOT NULL,
 version_number INTEGER NOT NULL,
 definition JSONB NOT NULL,
 transform_from_previous JSONB,
 frozen_at TIMESTAMPTZ,
 UNIQUE (queue_id, version_number)
);

 CREATE TABLE IF NOT EXISTS anvil_sample_refs (
 tenant UUID NOT NULL,
 queue_id UUID NOT NULL,
 id TEXT NOT NULL,
 version_tag TEXT NOT NULL,
 metadata JSONB NOT NULL,
 created_at TIMESTAMPTZ NOT NULL,
 PRIMARY KEY (tenant, id)
);

 CREATE TABLE IF NOT EXISTS anvil_assignments (
 id UUID PRIMARY KEY,
 queue_id UUID NOT NULL,
 sample_id TEXT NOT NULL,
 labeler_id UUID NOT NULL,
 tenant UUID NOT NULL,
 status TEXT NOT NULL,
 version BIGINT NOT NULL,
 attempts INTEGER NOT NULL,
 deadline TIMESTAMPTZ,
 reserved_at TIMESTAMPTZ,
 completed_at TIMESTAMPTZ,
 skipped_at TIMESTAMPTZ,
 expired_at TIMESTAMPTZ,
 skip_reason TEXT,
 label_id UUID,
 sample_version TEXT NOT NULL,
 requeue_attempts INTEGER NOT NULL,
 not_before TIMESTAMPTZ,
 created_at TIMESTAMPTZ NOT NULL
);

 CREATE TABLE IF NOT EXISTS anvil_labels (
 id UUID PRIMARY KEY,
 assignment_id UUID NOT NULL,
 labeler_id UUID NOT NULL,
 schema_version_id UUID NOT NULL,
 payload JSONB NOT NULL,
 submitted_at TIMESTAMPTZ NOT NULL,
 deleted_at TIMESTAMPTZ,
 redacted_fields JSONB NOT NULL DEFAULT '[]'
);

 CREATE TABLE IF NOT EXISTS anvil_labelers (
 id UUID PRIMARY KEY,
 tenant UUID NOT NULL,
 external_id TEXT NOT NULL,
 pseudonym TEXT NOT NULL,
 role TEXT NOT NULL,
 status TEXT NOT NULL,
 expertise_tier TEXT,
 blocklisted_queues JSONB NOT NULL,
 max_concurrent_assignments INTEGER NOT NULL,
 UNIQUE (tenant, external_id)
);

 CREATE TABLE IF NOT EXISTS anvil_queue_memberships (
 queue_id UUID NOT NULL,
 labeler_id UUID NOT NULL,
 role TEXT NOT NULL,
 granted_at TIMESTAMPTZ NOT NULL,
 granted_by UUID NOT NULL,
 expires_at TIMESTAMPTZ,
 revoked_at TIMESTAMPTZ,
 PRIMARY KEY (queue_id, labeler_id)
);

 CREATE TABLE IF NOT EXISTS anvil_audit_log (
 seq BIGSERIAL PRIMARY KEY,
 tenant UUID NOT NULL,
 actor_id TEXT NOT NULL,
 actor_type TEXT NOT NULL,
 action TEXT NOT NULL,
 entity_type TEXT NOT NULL,
 entity_id TEXT NOT NULL,
 metadata JSONB NOT NULL,
 occurred_at TIMESTAMPTZ NOT NULL
);
 "#,
)
.execute(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(())
 }
}

fn status_to_str(status: AssignmentStatus) -> &'static str {
 match status {
 AssignmentStatus::Pending => "pending",
 AssignmentStatus::InProgress => "in_progress",
 AssignmentStatus::Completed => "completed",
 AssignmentStatus::Expired => "expired",
 AssignmentStatus::Skipped => "skipped",
 }
}

#[async_trait]
impl AssignmentStore for PostgresStorage {
 async fn put_assignment(&self, assignment: Assignment) -> StorageResult<()> {
 sqlx::query(
 r#"
 INSERT INTO anvil_assignments
 (id, queue_id, sample_id, labeler_id, tenant, status, version, attempts,
 deadline, reserved_at, completed_at, skipped_at, expired_at, skip_reason,
 label_id, sample_version, requeue_attempts, not_before, created_at)
 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)
 ON CONFLICT (id) DO UPDATE SET
 status = EXCLUDED.status,
 version = EXCLUDED.version,
 attempts = EXCLUDED.attempts,
 deadline = EXCLUDED.deadline,
 reserved_at = EXCLUDED.reserved_at,
 completed_at = EXCLUDED.completed_at,
 skipped_at = EXCLUDED.skipped_at,
 expired_at = EXCLUDED.expired_at,
 skip_reason = EXCLUDED.skip_reason,
 label_id = EXCLUDED.label_id,
 requeue_attempts = EXCLUDED.requeue_attempts,
 not_before = EXCLUDED.not_before
 "#,
)
.bind(assignment.id.as_uuid())
.bind(assignment.queue_id.as_uuid())
.bind(assignment.sample_id.as_str())
.bind(assignment.labeler_id.as_uuid())
.bind(assignment.tenant.as_uuid())
.bind(status_to_str(assignment.status))
.bind(assignment.version as i64)
.bind(assignment.attempts as i32)
.bind(assignment.deadline)
.bind(assignment.reserved_at)
.bind(assignment.completed_at)
.bind(assignment.skipped_at)
.bind(assignment.expired_at)
.bind(assignment.skip_reason)
.bind(assignment.label_id.map(|id| *id.as_uuid()))
.bind(assignment.sample_version)
.bind(assignment.requeue_attempts as i32)
.bind(assignment.not_before)
.bind(assignment.created_at)
.execute(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(())
 }

 async fn get_assignment(
 &self,
 tenant: &TenantId,
 id: &AssignmentId,
) -> StorageResult<Option<Assignment>> {
 let row = sqlx::query(
 "SELECT * FROM anvil_assignments WHERE id = $1 AND tenant = $2",
)
.bind(id.as_uuid())
.bind(tenant.as_uuid())
.fetch_optional(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 row.map(row_to_assignment).transpose()
 }

 async fn list_assignments(
 &self,
 filter: AssignmentFilter,
 order_by: AssignmentOrderBy,
 order: SortOrder,
 for_update_skip_locked: bool,
) -> StorageResult<Vec<Assignment>> {
 // Built by hand rather than through a query builder crate (none is
 // in stack); every clause is parameterized so the
 // filter can never be used to inject SQL.
 let mut sql = String::from("SELECT * FROM anvil_assignments WHERE 1=1");
 let mut param = 0u32;
 if filter.tenant.is_some() {
 param += 1;
 sql.push_str(&format!(" AND tenant = ${param}"));
 }
 if filter.queue_id.is_some() {
 param += 1;
 sql.push_str(&format!(" AND queue_id = ${param}"));
 }
 if filter.labeler_id.is_some() {
 param += 1;
 sql.push_str(&format!(" AND labeler_id = ${param}"));
 }
 if filter.status.is_some() {
 param += 1;
 sql.push_str(&format!(" AND status = ${param}"));
 }
 if filter.deadline_before.is_some() {
 param += 1;
 sql.push_str(&format!(" AND deadline < ${param}"));
 }
 sql.push_str(match order_by {
 AssignmentOrderBy::CreatedAt => " ORDER BY created_at",
 AssignmentOrderBy::Deadline => " ORDER BY deadline",
 });
 sql.push_str(match order {
 SortOrder::Asc => " ASC",
 SortOrder::Desc => " DESC",
 });
 if for_update_skip_locked {
 sql.push_str(" FOR UPDATE SKIP LOCKED");
 }

 let mut query = sqlx::query(&sql);
 if let Some(t) = filter.tenant {
 query = query.bind(*t.as_uuid());
 }
 if let Some(q) = filter.queue_id {
 query = query.bind(*q.as_uuid());
 }
 if let Some(l) = filter.labeler_id {
 query = query.bind(*l.as_uuid());
 }
 if let Some(s) = filter.status {
 query = query.bind(status_to_str(s));
 }
 if let Some(d) = filter.deadline_before {
 query = query.bind(d);
 }

 let rows = query
.fetch_all(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 rows.into_iter().map(row_to_assignment).collect()
 }

 async fn update_assignment_cas(
 &self,
 assignment: Assignment,
 expected_version: u64,
) -> StorageResult<()> {
 let result = sqlx::query(
 r#"
 UPDATE anvil_assignments
 SET status = $1, version = $2, attempts = $3, deadline = $4,
 reserved_at = $5, completed_at = $6, skipped_at = $7,
 expired_at = $8, skip_reason = $9, label_id = $10,
 requeue_attempts = $11, not_before = $12
 WHERE id = $13 AND version = $14
 "#,
)
.bind(status_to_str(assignment.status))
.bind(assignment.version as i64)
.bind(assignment.attempts as i32)
.bind(assignment.deadline)
.bind(assignment.reserved_at)
.bind(assignment.completed_at)
.bind(assignment.skipped_at)
.bind(assignment.expired_at)
.bind(assignment.skip_reason.clone())
.bind(assignment.label_id.map(|id| *id.as_uuid()))
.bind(assignment.requeue_attempts as i32)
.bind(assignment.not_before)
.bind(assignment.id.as_uuid())
.bind(expected_version as i64)
.execute(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;

 if result.rows_affected() == 0 {
 let exists = sqlx::query("SELECT 1 FROM anvil_assignments WHERE id = $1")
.bind(assignment.id.as_uuid())
.fetch_optional(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?
.is_some();
 if exists {
 return Err(StorageError::Stale(format!(
 "assignment {} has moved on",
 assignment.id
)));
 }
 return Err(StorageError::NotFound(format!(
 "assignment {} not found",
 assignment.id
)));
 }
 Ok(())
 }
}

fn row_to_assignment(row: sqlx::postgres::PgRow) -> StorageResult<Assignment> {
 let status_str: String = row
.try_get("status")
.map_err(|e| StorageError::Backend(e.to_string()))?;
 let status = match status_str.as_str() {
 "pending" => AssignmentStatus::Pending,
 "in_progress" => AssignmentStatus::InProgress,
 "completed" => AssignmentStatus::Completed,
 "expired" => AssignmentStatus::Expired,
 "skipped" => AssignmentStatus::Skipped,
 other => {
 return Err(StorageError::Backend(format!(
 "unknown assignment status '{other}' in storage"
)))
 }
 };
 let label_id: Option<uuid::Uuid> = row
.try_get("label_id")
.map_err(|e| StorageError::Backend(e.to_string()))?;
 let sample_id: String = row
.try_get("sample_id")
.map_err(|e| StorageError::Backend(e.to_string()))?;

 Ok(Assignment {
 id: AssignmentId::from_uuid(
 row.try_get("id").map_err(|e| StorageError::Backend(e.to_string()))?,
),
 queue_id: QueueId::from_uuid(
 row.try_get("queue_id")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 sample_id: SampleId::new(sample_id),
 labeler_id: LabelerId::from_uuid(
 row.try_get("labeler_id")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 tenant: TenantId::from_uuid(
 row.try_get("tenant")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 status,
 version: row
.try_get::<i64, _>("version")
.map_err(|e| StorageError::Backend(e.to_string()))? as u64,
 attempts: row
.try_get::<i32, _>("attempts")
.map_err(|e| StorageError::Backend(e.to_string()))? as u32,
 deadline: row
.try_get("deadline")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 reserved_at: row
.try_get("reserved_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 completed_at: row
.try_get("completed_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 skipped_at: row
.try_get("skipped_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 expired_at: row
.try_get("expired_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 skip_reason: row
.try_get("skip_reason")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 label_id: label_id.map(LabelId::from_uuid),
 sample_version: row
.try_get("sample_version")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 requeue_attempts: row
.try_get::<i32, _>("requeue_attempts")
.map_err(|e| StorageError::Backend(e.to_string()))? as u32,
 not_before: row
.try_get("not_before")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 created_at: row
.try_get("created_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 })
}

#[async_trait]
impl AuditStore for PostgresStorage {
 async fn append_audit(&self, entry: AuditLog) -> StorageResult<()> {
 let actor_type = match entry.actor_type {
 anvil_types::entities::ActorType::Labeler => "labeler",
 anvil_types::entities::ActorType::Service => "service",
 anvil_types::entities::ActorType::System => "system",
 };
 sqlx::query(
 r#"
 INSERT INTO anvil_audit_log
 (tenant, actor_id, actor_type, action, entity_type, entity_id, metadata, occurred_at)
 VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
 "#,
)
.bind(entry.tenant.as_uuid())
.bind(entry.actor_id)
.bind(actor_type)
.bind(entry.action)
.bind(entry.entity_type)
.bind(entry.entity_id)
.bind(entry.metadata)
.bind(entry.occurred_at)
.execute(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(())
 }

 async fn list_audit(&self, tenant: &TenantId, limit: u64) -> StorageResult<Vec<AuditLog>> {
 let rows = sqlx::query(
 "SELECT * FROM anvil_audit_log WHERE tenant = $1 ORDER BY seq DESC LIMIT $2",
)
.bind(tenant.as_uuid())
.bind(limit as i64)
.fetch_all(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;

 rows.into_iter()
.map(|row| {
 let actor_type_str: String = row
.try_get("actor_type")
.map_err(|e| StorageError::Backend(e.to_string()))?;
 let actor_type = match actor_type_str.as_str() {
 "labeler" => anvil_types::entities::ActorType::Labeler,
 "service" => anvil_types::entities::ActorType::Service,
 _ => anvil_types::entities::ActorType::System,
 };
 Ok(AuditLog {
 tenant: TenantId::from_uuid(
 row.try_get("tenant")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 actor_id: row
.try_get("actor_id")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 actor_type,
 action: row
.try_get("action")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 entity_type: row
.try_get("entity_type")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 entity_id: row
.try_get("entity_id")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 metadata: row
.try_get("metadata")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 occurred_at: row
.try_get("occurred_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 })
 })
.collect()
 }
}

#[async_trait]
impl SampleRefStore for PostgresStorage {
 async fn put_sample_ref(&self, sample: SampleRef) -> StorageResult<()> {
 sqlx::query(
 r#"
 INSERT INTO anvil_sample_refs (tenant, queue_id, id, version_tag, metadata, created_at)
 VALUES ($1,$2,$3,$4,$5,$6)
 ON CONFLICT (tenant, id) DO UPDATE SET
 version_tag = EXCLUDED.version_tag, metadata = EXCLUDED.metadata
 "#,
)
.bind(sample.tenant.as_uuid())
.bind(sample.queue_id.as_uuid())
.bind(sample.id.as_str())
.bind(sample.version_tag)
.bind(sample.metadata)
.bind(sample.created_at)
.execute(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(())
 }

 async fn get_sample_ref(
 &self,
 tenant: &TenantId,
 id: &SampleId,
) -> StorageResult<Option<SampleRef>> {
 let row = sqlx::query("SELECT * FROM anvil_sample_refs WHERE tenant = $1 AND id = $2")
.bind(tenant.as_uuid())
.bind(id.as_str())
.fetch_optional(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 row.map(row_to_sample_ref).transpose()
 }

 async fn list_sample_refs(&self, filter: SampleRefFilter) -> StorageResult<Vec<SampleRef>> {
 let mut sql = String::from(
 "SELECT * FROM anvil_sample_refs WHERE 1=1",
);
 let mut param = 0u32;
 if filter.tenant.is_some() {
 param += 1;
 sql.push_str(&format!(" AND tenant = ${param}"));
 }
 if filter.queue_id.is_some() {
 param += 1;
 sql.push_str(&format!(" AND queue_id = ${param}"));
 }
 sql.push_str(" ORDER BY created_at ASC, id ASC");

 let mut query = sqlx::query(&sql);
 if let Some(t) = filter.tenant {
 query = query.bind(*t.as_uuid());
 }
 if let Some(q) = filter.queue_id {
 query = query.bind(*q.as_uuid());
 }
 let rows = query
.fetch_all(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 rows.into_iter().map(row_to_sample_ref).collect()
 }
}

fn row_to_sample_ref(row: sqlx::postgres::PgRow) -> StorageResult<SampleRef> {
 let id: String = row
.try_get("id")
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(SampleRef {
 tenant: TenantId::from_uuid(
 row.try_get("tenant")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 queue_id: QueueId::from_uuid(
 row.try_get("queue_id")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 id: SampleId::new(id),
 version_tag: row
.try_get("version_tag")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 metadata: row
.try_get("metadata")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 created_at: row
.try_get("created_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 })
}

#[async_trait]
impl LabelStore for PostgresStorage {
 async fn put_label(&self, label: Label) -> StorageResult<()> {
 sqlx::query(
 r#"
 INSERT INTO anvil_labels
 (id, assignment_id, labeler_id, schema_version_id, payload, submitted_at, deleted_at, redacted_fields)
 VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
 ON CONFLICT (id) DO UPDATE SET
 payload = EXCLUDED.payload,
 deleted_at = EXCLUDED.deleted_at,
 redacted_fields = EXCLUDED.redacted_fields
 "#,
)
.bind(label.id.as_uuid())
.bind(label.assignment_id.as_uuid())
.bind(label.labeler_id.as_uuid())
.bind(label.schema_version_id.as_uuid())
.bind(serde_json::to_value(&label.payload).map_err(|e| StorageError::Backend(e.to_string()))?)
.bind(label.submitted_at)
.bind(label.deleted_at)
.bind(serde_json::to_value(&label.redacted_fields).map_err(|e| StorageError::Backend(e.to_string()))?)
.execute(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(())
 }

 async fn get_label(&self, tenant: &TenantId, id: &LabelId) -> StorageResult<Option<Label>> {
 let row = sqlx::query(
 r#"
 SELECT l.* FROM anvil_labels l
 JOIN anvil_assignments a ON a.id = l.assignment_id
 WHERE l.id = $1 AND a.tenant = $2
 "#,
)
.bind(id.as_uuid())
.bind(tenant.as_uuid())
.fetch_optional(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 row.map(row_to_label).transpose()
 }

 async fn list_labels(
 &self,
 filter: LabelFilter,
 order: SortOrder,
 limit: Option<u64>,
 offset: Option<u64>,
 _stream: bool,
) -> StorageResult<Vec<Label>> {
 let mut sql = String::from(
 r#"
 SELECT l.* FROM anvil_labels l
 JOIN anvil_assignments a ON a.id = l.assignment_id
 WHERE ($1::boolean OR l.deleted_at IS NULL)
 "#,
);
 let mut param = 1u32;
 if filter.tenant.is_some() {
 param += 1;
 sql.push_str(&format!(" AND a.tenant = ${param}"));
 }
 if filter.queue_id.is_some() {
 param += 1;
 sql.push_str(&format!(" AND a.queue_id = ${param}"));
 }
 if filter.sample_id.is_some() {
 param += 1;
 sql.push_str(&format!(" AND a.sample_id = ${param}"));
 }
 if filter.schema_version_id.is_some() {
 param += 1;
 sql.push_str(&format!(" AND l.schema_version_id = ${param}"));
 }
 sql.push_str(" ORDER BY a.sample_id, l.labeler_id, l.submitted_at");
 sql.push_str(match order {
 SortOrder::Asc => " ASC",
 SortOrder::Desc => " DESC",
 });
 if let Some(limit) = limit {
 sql.push_str(&format!(" LIMIT {limit}"));
 }
 if let Some(offset) = offset {
 sql.push_str(&format!(" OFFSET {offset}"));
 }

 let mut query = sqlx::query(&sql).bind(filter.include_deleted);
 if let Some(t) = filter.tenant {
 query = query.bind(*t.as_uuid());
 }
 if let Some(q) = filter.queue_id {
 query = query.bind(*q.as_uuid());
 }
 if let Some(s) = &filter.sample_id {
 query = query.bind(s.as_str());
 }
 if let Some(v) = filter.schema_version_id {
 query = query.bind(*v.as_uuid());
 }

 let rows = query
.fetch_all(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 rows.into_iter().map(row_to_label).collect()
 }
}

fn row_to_label(row: sqlx::postgres::PgRow) -> StorageResult<Label> {
 let payload_json: serde_json::Value = row
.try_get("payload")
.map_err(|e| StorageError::Backend(e.to_string()))?;
 let payload = serde_json::from_value(payload_json)
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(Label {
 id: LabelId::from_uuid(row.try_get("id").map_err(|e| StorageError::Backend(e.to_string()))?),
 assignment_id: AssignmentId::from_uuid(
 row.try_get("assignment_id")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 labeler_id: LabelerId::from_uuid(
 row.try_get("labeler_id")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 schema_version_id: SchemaVersionId::from_uuid(
 row.try_get("schema_version_id")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 payload,
 submitted_at: row
.try_get("submitted_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 deleted_at: row
.try_get("deleted_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 redacted_fields: {
 let raw: serde_json::Value = row
.try_get("redacted_fields")
.map_err(|e| StorageError::Backend(e.to_string()))?;
 serde_json::from_value(raw).map_err(|e| StorageError::Backend(e.to_string()))?
 },
 })
}

#[async_trait]
impl QueueStore for PostgresStorage {
 async fn put_queue(&self, queue: Queue) -> StorageResult<()> {
 let status = match queue.status {
 anvil_types::entities::QueueStatus::Active => "active",
 anvil_types::entities::QueueStatus::Paused => "paused",
 anvil_types::entities::QueueStatus::Archived => "archived",
 };
 let access_mode = match queue.access_mode {
 anvil_types::entities::AccessMode::Private => "private",
 anvil_types::entities::AccessMode::Restricted => "restricted",
 anvil_types::entities::AccessMode::Public => "public",
 };
 let result = sqlx::query(
 r#"
 INSERT INTO anvil_queues
 (id, tenant, name, schema_version_id, status, access_mode,
 labels_per_sample, assignment_timeout_secs, created_at)
 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
 ON CONFLICT (id) DO UPDATE SET
 status = EXCLUDED.status, access_mode = EXCLUDED.access_mode,
 schema_version_id = EXCLUDED.schema_version_id
 "#,
)
.bind(queue.id.as_uuid())
.bind(queue.tenant.as_uuid())
.bind(&queue.name)
.bind(queue.schema_version_id.as_uuid())
.bind(status)
.bind(access_mode)
.bind(queue.labels_per_sample as i32)
.bind(queue.assignment_timeout_secs as i64)
.bind(queue.created_at)
.execute(&self.pool)
.await;

 match result {
 Ok(_) => Ok(()),
 Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
 Err(StorageError::Conflict(format!(
 "queue name '{}' already exists for tenant",
 queue.name
)))
 }
 Err(e) => Err(StorageError::Backend(e.to_string())),
 }
 }

 async fn get_queue(&self, tenant: &TenantId, id: &QueueId) -> StorageResult<Option<Queue>> {
 let row = sqlx::query("SELECT * FROM anvil_queues WHERE id = $1 AND tenant = $2")
.bind(id.as_uuid())
.bind(tenant.as_uuid())
.fetch_optional(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 row.map(row_to_queue).transpose()
 }

 async fn get_queue_by_name(
 &self,
 tenant: &TenantId,
 name: &str,
) -> StorageResult<Option<Queue>> {
 let row = sqlx::query("SELECT * FROM anvil_queues WHERE tenant = $1 AND name = $2")
.bind(tenant.as_uuid())
.bind(name)
.fetch_optional(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 row.map(row_to_queue).transpose()
 }

 async fn list_queues(&self) -> StorageResult<Vec<Queue>> {
 let rows = sqlx::query("SELECT * FROM anvil_queues")
.fetch_all(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 rows.into_iter().map(row_to_queue).collect()
 }

 async fn put_schema_version(&self, version: SchemaVersion) -> StorageResult<()> {
 let transform = version
.transform_from_previous
.as_ref()
.map(serde_json::to_value)
.transpose()
.map_err(|e| StorageError::Backend(e.to_string()))?;
 sqlx::query(
 r#"
 INSERT INTO anvil_schema_versions
 (id, queue_id, version_number, definition, transform_from_previous, frozen_at)
 VALUES ($1,$2,$3,$4,$5,$6)
 ON CONFLICT (id) DO UPDATE SET
 definition = EXCLUDED.definition,
 transform_from_previous = EXCLUDED.transform_from_previous
 WHERE anvil_schema_versions.frozen_at IS NULL
 "#,
)
.bind(version.id.as_uuid())
.bind(version.queue_id.as_uuid())
.bind(version.version_number as i32)
.bind(serde_json::to_value(&version.definition).map_err(|e| StorageError::Backend(e.to_string()))?)
.bind(transform)
.bind(version.frozen_at)
.execute(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(())
 }

 async fn get_schema_version(
 &self,
 queue_id: &QueueId,
 id: &SchemaVersionId,
) -> StorageResult<Option<SchemaVersion>> {
 let row = sqlx::query(
 "SELECT * FROM anvil_schema_versions WHERE id = $1 AND queue_id = $2",
)
.bind(id.as_uuid())
.bind(queue_id.as_uuid())
.fetch_optional(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 row.map(row_to_schema_version).transpose()
 }

 async fn list_schema_versions(&self, queue_id: &QueueId) -> StorageResult<Vec<SchemaVersion>> {
 let rows = sqlx::query(
 "SELECT * FROM anvil_schema_versions WHERE queue_id = $1 ORDER BY version_number ASC",
)
.bind(queue_id.as_uuid())
.fetch_all(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 rows.into_iter().map(row_to_schema_version).collect()
 }

 async fn freeze_schema_version(
 &self,
 id: &SchemaVersionId,
 at: DateTime<Utc>,
) -> StorageResult<()> {
 sqlx::query(
 "UPDATE anvil_schema_versions SET frozen_at = $1 WHERE id = $2 AND frozen_at IS NULL",
)
.bind(at)
.bind(id.as_uuid())
.execute(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(())
 }
}

fn row_to_queue(row: sqlx::postgres::PgRow) -> StorageResult<Queue> {
 let status_str: String = row.try_get("status").map_err(|e| StorageError::Backend(e.to_string()))?;
 let status = match status_str.as_str() {
 "active" => anvil_types::entities::QueueStatus::Active,
 "paused" => anvil_types::entities::QueueStatus::Paused,
 _ => anvil_types::entities::QueueStatus::Archived,
 };
 let access_str: String = row
.try_get("access_mode")
.map_err(|e| StorageError::Backend(e.to_string()))?;
 let access_mode = match access_str.as_str() {
 "private" => anvil_types::entities::AccessMode::Private,
 "restricted" => anvil_types::entities::AccessMode::Restricted,
 _ => anvil_types::entities::AccessMode::Public,
 };
 Ok(Queue {
 id: QueueId::from_uuid(row.try_get("id").map_err(|e| StorageError::Backend(e.to_string()))?),
 tenant: TenantId::from_uuid(
 row.try_get("tenant").map_err(|e| StorageError::Backend(e.to_string()))?,
),
 name: row.try_get("name").map_err(|e| StorageError::Backend(e.to_string()))?,
 schema_version_id: SchemaVersionId::from_uuid(
 row.try_get("schema_version_id")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 status,
 access_mode,
 labels_per_sample: row
.try_get::<i32, _>("labels_per_sample")
.map_err(|e| StorageError::Backend(e.to_string()))? as u32,
 assignment_timeout_secs: row
.try_get::<i64, _>("assignment_timeout_secs")
.map_err(|e| StorageError::Backend(e.to_string()))? as u64,
 created_at: row
.try_get("created_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 })
}

fn row_to_schema_version(row: sqlx::postgres::PgRow) -> StorageResult<SchemaVersion> {
 let definition_json: serde_json::Value = row
.try_get("definition")
.map_err(|e| StorageError::Backend(e.to_string()))?;
 let definition = serde_json::from_value(definition_json)
.map_err(|e| StorageError::Backend(e.to_string()))?;
 let transform_json: Option<serde_json::Value> = row
.try_get("transform_from_previous")
.map_err(|e| StorageError::Backend(e.to_string()))?;
 let transform_from_previous = transform_json
.map(serde_json::from_value)
.transpose()
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(SchemaVersion {
 id: SchemaVersionId::from_uuid(
 row.try_get("id").map_err(|e| StorageError::Backend(e.to_string()))?,
),
 queue_id: QueueId::from_uuid(
 row.try_get("queue_id").map_err(|e| StorageError::Backend(e.to_string()))?,
),
 version_number: row
.try_get::<i32, _>("version_number")
.map_err(|e| StorageError::Backend(e.to_string()))? as u32,
 definition,
 transform_from_previous,
 frozen_at: row
.try_get("frozen_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 })
}

#[async_trait]
impl LabelerStore for PostgresStorage {
 async fn put_labeler(&self, labeler: Labeler) -> StorageResult<()> {
 let role = labeler_role_to_str(labeler.role);
 let status = match labeler.status {
 anvil_types::entities::LabelerStatus::Active => "active",
 anvil_types::entities::LabelerStatus::Suspended => "suspended",
 anvil_types::entities::LabelerStatus::Deactivated => "deactivated",
 };
 let tier = labeler.expertise_tier.map(|t| match t {
 anvil_types::entities::DifficultyTier::Simple => "simple",
 anvil_types::entities::DifficultyTier::Moderate => "moderate",
 anvil_types::entities::DifficultyTier::Complex => "complex",
 });
 sqlx::query(
 r#"
 INSERT INTO anvil_labelers
 (id, tenant, external_id, pseudonym, role, status, expertise_tier,
 blocklisted_queues, max_concurrent_assignments)
 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
 ON CONFLICT (id) DO UPDATE SET
 pseudonym = EXCLUDED.pseudonym, role = EXCLUDED.role,
 status = EXCLUDED.status, expertise_tier = EXCLUDED.expertise_tier,
 blocklisted_queues = EXCLUDED.blocklisted_queues,
 max_concurrent_assignments = EXCLUDED.max_concurrent_assignments
 "#,
)
.bind(labeler.id.as_uuid())
.bind(labeler.tenant.as_uuid())
.bind(&labeler.external_id)
.bind(&labeler.pseudonym)
.bind(role)
.bind(status)
.bind(tier)
.bind(serde_json::to_value(&labeler.blocklisted_queues).map_err(|e| StorageError::Backend(e.to_string()))?)
.bind(labeler.max_concurrent_assignments as i32)
.execute(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(())
 }

 async fn get_labeler(
 &self,
 tenant: &TenantId,
 id: &LabelerId,
) -> StorageResult<Option<Labeler>> {
 let row = sqlx::query("SELECT * FROM anvil_labelers WHERE id = $1 AND tenant = $2")
.bind(id.as_uuid())
.bind(tenant.as_uuid())
.fetch_optional(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 row.map(row_to_labeler).transpose()
 }

 async fn get_labeler_by_external_id(
 &self,
 tenant: &TenantId,
 external_id: &str,
) -> StorageResult<Option<Labeler>> {
 let row = sqlx::query(
 "SELECT * FROM anvil_labelers WHERE tenant = $1 AND external_id = $2",
)
.bind(tenant.as_uuid())
.bind(external_id)
.fetch_optional(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 row.map(row_to_labeler).transpose()
 }

 async fn put_queue_membership(&self, membership: QueueMembership) -> StorageResult<()> {
 let role = match membership.role {
 anvil_types::entities::MembershipRole::Labeler => "labeler",
 anvil_types::entities::MembershipRole::Reviewer => "reviewer",
 anvil_types::entities::MembershipRole::Owner => "owner",
 };
 sqlx::query(
 r#"
 INSERT INTO anvil_queue_memberships
 (queue_id, labeler_id, role, granted_at, granted_by, expires_at, revoked_at)
 VALUES ($1,$2,$3,$4,$5,$6,$7)
 ON CONFLICT (queue_id, labeler_id) DO UPDATE SET
 role = EXCLUDED.role, expires_at = EXCLUDED.expires_at,
 revoked_at = EXCLUDED.revoked_at
 "#,
)
.bind(membership.queue_id.as_uuid())
.bind(membership.labeler_id.as_uuid())
.bind(role)
.bind(membership.granted_at)
.bind(membership.granted_by.as_uuid())
.bind(membership.expires_at)
.bind(membership.revoked_at)
.execute(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(())
 }

 async fn list_queue_memberships(
 &self,
 labeler_id: &LabelerId,
) -> StorageResult<Vec<QueueMembership>> {
 let rows = sqlx::query("SELECT * FROM anvil_queue_memberships WHERE labeler_id = $1")
.bind(labeler_id.as_uuid())
.fetch_all(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 rows.into_iter().map(row_to_membership).collect()
 }

 async fn get_queue_membership(
 &self,
 queue_id: &QueueId,
 labeler_id: &LabelerId,
) -> StorageResult<Option<QueueMembership>> {
 let row = sqlx::query(
 "SELECT * FROM anvil_queue_memberships WHERE queue_id = $1 AND labeler_id = $2",
)
.bind(queue_id.as_uuid())
.bind(labeler_id.as_uuid())
.fetch_optional(&self.pool)
.await
.map_err(|e| StorageError::Backend(e.to_string()))?;
 row.map(row_to_membership).transpose()
 }
}

fn labeler_role_to_str(role: anvil_types::entities::LabelerRole) -> &'static str {
 match role {
 anvil_types::entities::LabelerRole::Labeler => "labeler",
 anvil_types::entities::LabelerRole::Reviewer => "reviewer",
 anvil_types::entities::LabelerRole::Adjudicator => "adjudicator",
 anvil_types::entities::LabelerRole::Owner => "owner",
 anvil_types::entities::LabelerRole::Admin => "admin",
 }
}

fn row_to_labeler(row: sqlx::postgres::PgRow) -> StorageResult<Labeler> {
 let role_str: String = row.try_get("role").map_err(|e| StorageError::Backend(e.to_string()))?;
 let role = match role_str.as_str() {
 "reviewer" => anvil_types::entities::LabelerRole::Reviewer,
 "adjudicator" => anvil_types::entities::LabelerRole::Adjudicator,
 "owner" => anvil_types::entities::LabelerRole::Owner,
 "admin" => anvil_types::entities::LabelerRole::Admin,
 _ => anvil_types::entities::LabelerRole::Labeler,
 };
 let status_str: String = row.try_get("status").map_err(|e| StorageError::Backend(e.to_string()))?;
 let status = match status_str.as_str() {
 "suspended" => anvil_types::entities::LabelerStatus::Suspended,
 "deactivated" => anvil_types::entities::LabelerStatus::Deactivated,
 _ => anvil_types::entities::LabelerStatus::Active,
 };
 let tier_str: Option<String> = row
.try_get("expertise_tier")
.map_err(|e| StorageError::Backend(e.to_string()))?;
 let expertise_tier = tier_str.map(|t| match t.as_str() {
 "moderate" => anvil_types::entities::DifficultyTier::Moderate,
 "complex" => anvil_types::entities::DifficultyTier::Complex,
 _ => anvil_types::entities::DifficultyTier::Simple,
 });
 let blocklisted_json: serde_json::Value = row
.try_get("blocklisted_queues")
.map_err(|e| StorageError::Backend(e.to_string()))?;
 let blocklisted_queues = serde_json::from_value(blocklisted_json)
.map_err(|e| StorageError::Backend(e.to_string()))?;
 Ok(Labeler {
 id: LabelerId::from_uuid(row.try_get("id").map_err(|e| StorageError::Backend(e.to_string()))?),
 tenant: TenantId::from_uuid(
 row.try_get("tenant").map_err(|e| StorageError::Backend(e.to_string()))?,
),
 external_id: row
.try_get("external_id")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 pseudonym: row
.try_get("pseudonym")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 role,
 status,
 expertise_tier,
 blocklisted_queues,
 max_concurrent_assignments: row
.try_get::<i32, _>("max_concurrent_assignments")
.map_err(|e| StorageError::Backend(e.to_string()))? as u32,
 })
}

fn row_to_membership(row: sqlx::postgres::PgRow) -> StorageResult<QueueMembership> {
 let role_str: String = row.try_get("role").map_err(|e| StorageError::Backend(e.to_string()))?;
 let role = match role_str.as_str() {
 "reviewer" => anvil_types::entities::MembershipRole::Reviewer,
 "owner" => anvil_types::entities::MembershipRole::Owner,
 _ => anvil_types::entities::MembershipRole::Labeler,
 };
 Ok(QueueMembership {
 queue_id: QueueId::from_uuid(
 row.try_get("queue_id").map_err(|e| StorageError::Backend(e.to_string()))?,
),
 labeler_id: LabelerId::from_uuid(
 row.try_get("labeler_id")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 role,
 granted_at: row
.try_get("granted_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 granted_by: LabelerId::from_uuid(
 row.try_get("granted_by")
.map_err(|e| StorageError::Backend(e.to_string()))?,
),
 expires_at: row
.try_get("expires_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 revoked_at: row
.try_get("revoked_at")
.map_err(|e| StorageError::Backend(e.to_string()))?,
 })
}

impl Storage for PostgresStorage {}
