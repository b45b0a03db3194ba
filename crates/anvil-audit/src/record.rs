//! Builder for the audit envelope so every call site constructs
//! entries the same way instead of hand-assembling the struct.

use anvil_types::entities::{ActorType, AuditLog};
use anvil_types::ids::TenantId;
use chrono::Utc;
use serde_json::Value;

pub fn record(
 tenant: TenantId,
 actor_id: impl Into<String>,
 actor_type: ActorType,
 action: impl Into<String>,
 entity_type: impl Into<String>,
 entity_id: impl Into<String>,
 metadata: Value,
) -> AuditLog {
 AuditLog {
 tenant,
 actor_id: actor_id.into(),
 actor_type,
 action: action.into(),
 entity_type: entity_type.into(),
 entity_id: entity_id.into(),
 metadata,
 occurred_at: Utc::now(),
 }
}
