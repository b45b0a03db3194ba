//! Pseudonym generation and field-level redaction.

pub mod error;
pub mod pseudonym;
pub mod redact;

pub use error::{PrivacyError, PrivacyResult};
pub use pseudonym::generate_pseudonym;
pub use redact::{redact_value, redact_value_with_patterns};
