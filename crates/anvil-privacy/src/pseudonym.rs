//! Deterministic, tenant-scoped pseudonym generation (,
//! property P9): `"labeler_" + hex(HMAC-SHA256(secret, tenant_id ||
//! ":" || external_id)).truncate(16)`. Stable for a fixed secret;
//! rotating the secret regenerates every pseudonym and is an explicit
//! operator action, never performed implicitly by this crate.

use anvil_types::TenantId;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{PrivacyError, PrivacyResult};

type HmacSha256 = Hmac<Sha256>;

const TRUNCATE_LEN: usize = 16;

/// Generates the stable pseudonym for `(tenant, external_id)` under
/// `secret`. Pure and one-way: there is no corresponding "reverse"
/// function in this crate.
pub fn generate_pseudonym(secret: &[u8], tenant: &TenantId, external_id: &str) -> PrivacyResult<String> {
 let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| PrivacyError::InvalidKey)?;
 mac.update(tenant.as_uuid().as_bytes());
 mac.update(b":");
 mac.update(external_id.as_bytes());
 let digest = mac.finalize().into_bytes();
 let hex_digest = hex::encode(digest);
 Ok(format!("labeler_{}", &hex_digest[..TRUNCATE_LEN]))
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn pseudonym_is_deterministic_for_fixed_secret() {
 let secret = b"test-secret";
 let tenant = TenantId::generate();
 let a = generate_pseudonym(secret, &tenant, "ext-1").unwrap();
 let b = generate_pseudonym(secret, &tenant, "ext-1").unwrap();
 assert_eq!(a, b);
 assert!(a.starts_with("labeler_"));
 }

 #[test]
 fn different_tenants_yield_different_pseudonyms() {
 let secret = b"test-secret";
 let t1 = TenantId::generate();
 let t2 = TenantId::generate();
 let a = generate_pseudonym(secret, &t1, "ext-1").unwrap();
 let b = generate_pseudonym(secret, &t2, "ext-1").unwrap();
 assert_ne!(a, b);
 }

 #[test]
 fn secret_rotation_changes_pseudonym() {
 let tenant = TenantId::generate();
 let a = generate_pseudonym(b"secret-v1", &tenant, "ext-1").unwrap();
 let b = generate_pseudonym(b"secret-v2", &tenant, "ext-1").unwrap();
 assert_ne!(a, b);
 }
}
