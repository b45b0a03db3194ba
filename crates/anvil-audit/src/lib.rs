//! Audit log and telemetry ports.

pub mod chain;
pub mod error;
pub mod record;
pub mod telemetry;

pub use chain::HashChainedAuditLog;
pub use error::{AuditError, AuditResult};
pub use record::record;
pub use telemetry::{Telemetry, TelemetryEvent, TracingTelemetry};
