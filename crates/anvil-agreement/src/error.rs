use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgreementError {
 /// Fewer than 2 raters supplied a non-nil value for this dimension.
 /// Per this is a non-error result, not a surfaced failure —
 /// callers should match on it rather than propagate it as a fault.
 #[error("insufficient labels: need at least 2 non-nil raters, got {0}")]
 InsufficientLabels(usize),
}

pub type AgreementResult<T> = Result<T, AgreementError>;
