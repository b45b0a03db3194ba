//! The timeout reclaimer: a periodic sweep that expires
//! `in_progress` assignments whose deadline has passed and applies each
//! queue's [`anvil_policy::RequeuePolicy`] to the result.

pub mod error;
pub mod sweep;

pub use error::{ReclaimerError, ReclaimerResult};
pub use sweep::{Reclaimer, SweepReport};
