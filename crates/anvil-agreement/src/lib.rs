//! Inter-rater agreement computation: Cohen's kappa, Fleiss'
//! kappa, Krippendorff's alpha, and the percent-agreement fallback, with
//! online and batch recompute modes.

pub mod accumulator;
pub mod band;
pub mod batch;
pub mod distance;
pub mod error;
pub mod kappa;
pub mod rating;
pub mod select;

pub use accumulator::AgreementAccumulator;
pub use band::qualitative_band;
pub use batch::{recompute_queue_field, SampleRatings};
pub use distance::{krippendorff_alpha, percent_agreement, DistanceMetric};
pub use error::{AgreementError, AgreementResult};
pub use kappa::{cohen_kappa, fleiss_kappa};
pub use rating::Rating;
pub use select::{compute_field_agreement, AgreementOutcome};
