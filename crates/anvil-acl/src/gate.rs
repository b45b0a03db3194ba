//! Tenant scoping and capability gating. Grounded on the
//! teacher's `palm-policy` gate shape: a small trait-free function that
//! evaluates a single decision rather than a trait-object chain, since
//! this gate has exactly one policy (its table), not a pluggable
//! set.

use anvil_types::entities::{Labeler, LabelerRole, MembershipRole, QueueMembership};
use anvil_types::{Queue, TenantId};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::capability::{role_rank, Capability};
use crate::error::{AclError, AclResult};

/// Verifies `caller.tenant == queue.tenant`, Platform
/// admins (`LabelerRole::Admin`) are the sole exception named in the
/// spec's capability table ("cross-tenant actions forbidden except for
/// platform admins").
pub fn check_tenant(caller: &Labeler, queue: &Queue) -> AclResult<()> {
 if caller.tenant == queue.tenant {
 return Ok(());
 }
 if caller.role == LabelerRole::Admin {
 return Ok(());
 }
 warn!(
 caller_tenant = %caller.tenant,
 queue_tenant = %queue.tenant,
 "tenant mismatch"
);
 Err(AclError::TenantMismatch)
}

/// Verifies an active queue membership exists for `caller` and its role
/// meets `capability`'s minimum, per the table. Tenant scoping
/// must already have been checked via [`check_tenant`]; this function
/// does not re-derive `caller.tenant`.
pub fn check_capability(
 membership: Option<&QueueMembership>,
 capability: Capability,
 now: DateTime<Utc>,
) -> AclResult<()> {
 let membership = membership.ok_or_else(|| {
 AclError::Forbidden(format!("no queue membership for capability {capability:?}"))
 })?;

 if !membership.is_active(now) {
 return Err(AclError::Forbidden("queue membership is revoked or expired".into()));
 }

 let required = capability.minimum_role;
 if role_rank(membership.role) < role_rank(required) {
 return Err(AclError::Forbidden(format!(
 "role {:?} does not meet minimum {:?} for capability {:?}",
 membership.role, required, capability
)));
 }
 Ok(())
}

/// Convenience wrapper combining [`check_tenant`] and [`check_capability`]
/// for the common case: one caller, one queue, one capability.
pub fn authorize(
 caller: &Labeler,
 queue: &Queue,
 membership: Option<&QueueMembership>,
 capability: Capability,
 now: DateTime<Utc>,
) -> AclResult<()> {
 check_tenant(caller, queue)?;
 check_capability(membership, capability, now)
}

/// Whether `tenant` would be considered the same tenant as `queue` for a
/// read-only view, without requiring a full [`authorize`] call. Used by
/// callers that want to short-circuit before loading a membership row.
pub fn same_tenant(tenant: &TenantId, queue: &Queue) -> bool {
 *tenant == queue.tenant
}

#[cfg(test)]
mod tests {
 use super::*;
 use anvil_types::entities::{AccessMode, LabelerStatus, QueueStatus};
 use anvil_types::{LabelerId, QueueId, SchemaVersionId};

 fn labeler(tenant: TenantId, role: LabelerRole) -> Labeler {
 Labeler {
 id: LabelerId::generate(),
 tenant,
 external_id: "ext-1".into(),
 pseudonym: "labeler_abcdef0123456789".into(),
 role,
 status: LabelerStatus::Active,
 expertise_tier: None,
 blocklisted_queues: vec![],
 max_concurrent_assignments: 5,
 }
 }

 fn queue(tenant: TenantId) -> Queue {
 Queue {
 id: QueueId::generate(),
 tenant,
 name: "q1".into(),
 schema_version_id: SchemaVersionId::generate(),
 status: QueueStatus::Active,
 access_mode: AccessMode::Private,
 labels_per_sample: 1,
 assignment_timeout_secs: 60,
 created_at: Utc::now(),
 }
 }

 fn membership(queue_id: QueueId, labeler_id: LabelerId, role: MembershipRole) -> QueueMembership {
 QueueMembership {
 queue_id,
 labeler_id,
 role,
 granted_at: Utc::now(),
 granted_by: labeler_id,
 expires_at: None,
 revoked_at: None,
 }
 }

 #[test]
 fn cross_tenant_caller_is_rejected() {
 let t1 = TenantId::generate();
 let t2 = TenantId::generate();
 let caller = labeler(t2, LabelerRole::Labeler);
 let q = queue(t1);
 assert!(matches!(check_tenant(&caller, &q), Err(AclError::TenantMismatch)));
 }

 #[test]
 fn platform_admin_bypasses_tenant_check() {
 let t1 = TenantId::generate();
 let t2 = TenantId::generate();
 let caller = labeler(t2, LabelerRole::Admin);
 let q = queue(t1);
 assert!(check_tenant(&caller, &q).is_ok());
 }

 #[test]
 fn revoked_membership_is_forbidden() {
 let t1 = TenantId::generate();
 let caller = labeler(t1, LabelerRole::Labeler);
 let q = queue(t1);
 let mut m = membership(q.id, caller.id, MembershipRole::Labeler);
 m.revoked_at = Some(Utc::now());
 let result = check_capability(Some(&m), Capability::RequestAssignment, Utc::now());
 assert!(result.is_err());
 }

 #[test]
 fn labeler_role_cannot_export() {
 let t1 = TenantId::generate();
 let caller = labeler(t1, LabelerRole::Labeler);
 let q = queue(t1);
 let m = membership(q.id, caller.id, MembershipRole::Labeler);
 let result = check_capability(Some(&m), Capability::Export, Utc::now());
 assert!(result.is_err());
 }

 #[test]
 fn owner_role_can_archive_queue() {
 let t1 = TenantId::generate();
 let caller = labeler(t1, LabelerRole::Owner);
 let q = queue(t1);
 let m = membership(q.id, caller.id, MembershipRole::Owner);
 assert!(check_capability(Some(&m), Capability::ArchiveQueue, Utc::now()).is_ok());
 }
}
