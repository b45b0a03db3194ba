//! The Storage port: the abstract contract every coordinator,
//! sweeper, and exporter is built against. All operations are
//! tenant-scoped; adapters MUST reject or filter rows outside the caller's
//! tenant rather than relying on callers to remember to ask.

use crate::error::StorageResult;
use anvil_types::{
 AssignmentId, AuditLog, Label, LabelId, LabelerId, Labeler, Queue, QueueId, QueueMembership,
 SampleId, SampleRef, SchemaVersion, SchemaVersionId, TenantId,
};
use anvil_types::entities::{Assignment, AssignmentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Sort order for a listing query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
 Asc,
 Desc,
}

/// Which column an assignment listing is ordered by. Only `created_at` is
/// named /§4.5, but the type leaves room for future orderings
/// without changing the trait signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOrderBy {
 CreatedAt,
 Deadline,
}

/// Filter over the assignment table. `None` fields are unconstrained.
#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
 pub tenant: Option<TenantId>,
 pub queue_id: Option<QueueId>,
 pub labeler_id: Option<LabelerId>,
 pub sample_id: Option<SampleId>,
 pub status: Option<AssignmentStatus>,
 pub deadline_before: Option<DateTime<Utc>>,
}

/// Filter over the label table, used by both agreement recomputation and
/// export.
#[derive(Debug, Clone, Default)]
pub struct LabelFilter {
 pub tenant: Option<TenantId>,
 pub queue_id: Option<QueueId>,
 pub sample_id: Option<SampleId>,
 pub schema_version_id: Option<SchemaVersionId>,
 pub include_deleted: bool,
}

/// Filter over sample references, used to resolve a queue's eligible set.
#[derive(Debug, Clone, Default)]
pub struct SampleRefFilter {
 pub tenant: Option<TenantId>,
 pub queue_id: Option<QueueId>,
}

/// Storage for sample references (, §4.2's pinned version tag).
#[async_trait]
pub trait SampleRefStore: Send + Sync {
 async fn put_sample_ref(&self, sample: SampleRef) -> StorageResult<()>;

 async fn get_sample_ref(
 &self,
 tenant: &TenantId,
 id: &SampleId,
) -> StorageResult<Option<SampleRef>>;

 async fn list_sample_refs(&self, filter: SampleRefFilter) -> StorageResult<Vec<SampleRef>>;
}

/// Storage for assignments, including the optimistic-lock transition and
/// the skip-locked reservation query that make concurrent dispatch safe
///.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
 async fn put_assignment(&self, assignment: Assignment) -> StorageResult<()>;

 async fn get_assignment(
 &self,
 tenant: &TenantId,
 id: &AssignmentId,
) -> StorageResult<Option<Assignment>>;

 /// `for_update_skip_locked` requests the "select for update, skip
 /// locked" semantic over the matching rows; adapters that cannot
 /// offer true row locking (e.g. the in-memory adapter) still produce
 /// a correct single-process result because the whole adapter holds
 /// one exclusive lock per call.
 async fn list_assignments(
 &self,
 filter: AssignmentFilter,
 order_by: AssignmentOrderBy,
 order: SortOrder,
 for_update_skip_locked: bool,
) -> StorageResult<Vec<Assignment>>;

 /// Compare-and-swap update: succeeds only if the stored version
 /// equals `expected_version`, in which case the stored version
 /// becomes `assignment.version` (which callers set to
 /// `expected_version + 1`). Returns [`crate::error::StorageError::Stale`]
 /// on a version mismatch and [`crate::error::StorageError::NotFound`]
 /// if the row does not exist at all.
 async fn update_assignment_cas(
 &self,
 assignment: Assignment,
 expected_version: u64,
) -> StorageResult<()>;
}

/// Storage for labels.
#[async_trait]
pub trait LabelStore: Send + Sync {
 async fn put_label(&self, label: Label) -> StorageResult<()>;

 async fn get_label(&self, tenant: &TenantId, id: &LabelId) -> StorageResult<Option<Label>>;

 /// `limit`/`offset` support streaming export; `stream` is a hint that
 /// the adapter may return results incrementally rather than
 /// materializing the full page (the in-memory adapter ignores it).
 async fn list_labels(
 &self,
 filter: LabelFilter,
 order: SortOrder,
 limit: Option<u64>,
 offset: Option<u64>,
 stream: bool,
) -> StorageResult<Vec<Label>>;
}

/// Storage for queues and schema versions.
#[async_trait]
pub trait QueueStore: Send + Sync {
 async fn put_queue(&self, queue: Queue) -> StorageResult<()>;

 async fn get_queue(&self, tenant: &TenantId, id: &QueueId) -> StorageResult<Option<Queue>>;

 /// Enforces the `(tenant, name)` uniqueness constraint named in spec
 /// §3.
 async fn get_queue_by_name(
 &self,
 tenant: &TenantId,
 name: &str,
) -> StorageResult<Option<Queue>>;

 /// Every queue across every tenant. Not named — added so
 /// a scheduling process (the reference daemon) can discover the
 /// working set for the reclaim/retention sweeps without the caller
 /// hand-maintaining its own queue registry.
 async fn list_queues(&self) -> StorageResult<Vec<Queue>>;

 async fn put_schema_version(&self, version: SchemaVersion) -> StorageResult<()>;

 async fn get_schema_version(
 &self,
 queue_id: &QueueId,
 id: &SchemaVersionId,
) -> StorageResult<Option<SchemaVersion>>;

 async fn list_schema_versions(&self, queue_id: &QueueId) -> StorageResult<Vec<SchemaVersion>>;

 /// Atomic and idempotent: calling this twice with the same `id` is a
 /// no-op on the second call rather than an error, matching the "first
 /// Label write freezes the version" invariant, which may
 /// race with an explicit freeze call.
 async fn freeze_schema_version(
 &self,
 id: &SchemaVersionId,
 at: DateTime<Utc>,
) -> StorageResult<()>;
}

/// Storage for labelers and queue memberships.
#[async_trait]
pub trait LabelerStore: Send + Sync {
 async fn put_labeler(&self, labeler: Labeler) -> StorageResult<()>;

 async fn get_labeler(
 &self,
 tenant: &TenantId,
 id: &LabelerId,
) -> StorageResult<Option<Labeler>>;

 async fn get_labeler_by_external_id(
 &self,
 tenant: &TenantId,
 external_id: &str,
) -> StorageResult<Option<Labeler>>;

 async fn put_queue_membership(&self, membership: QueueMembership) -> StorageResult<()>;

 async fn list_queue_memberships(
 &self,
 labeler_id: &LabelerId,
) -> StorageResult<Vec<QueueMembership>>;

 async fn get_queue_membership(
 &self,
 queue_id: &QueueId,
 labeler_id: &LabelerId,
) -> StorageResult<Option<QueueMembership>>;
}

/// Append-only audit storage.
#[async_trait]
pub trait AuditStore: Send + Sync {
 async fn append_audit(&self, entry: AuditLog) -> StorageResult<()>;

 async fn list_audit(&self, tenant: &TenantId, limit: u64) -> StorageResult<Vec<AuditLog>>;
}

/// The combined port every coordinator, sweeper, and exporter depends on.
#[async_trait]
pub trait Storage:
 SampleRefStore
 + AssignmentStore
 + LabelStore
 + QueueStore
 + LabelerStore
 + AuditStore
 + Send
 + Sync
{
}
