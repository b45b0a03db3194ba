//! ACL and tenant scoping: tenant-mismatch rejection plus the
//! role-based capability gate named in the table.

pub mod capability;
pub mod error;
pub mod gate;

pub use capability::{role_rank, Capability};
pub use error::{AclError, AclResult};
pub use gate::{authorize, check_capability, check_tenant, same_tenant};
