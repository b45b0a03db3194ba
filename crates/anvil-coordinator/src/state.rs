//! The assignment lifecycle. Grounded on `palm-deployment::
//! state`'s shape: a small explicit lifecycle enum plus a `can_transition`
//! predicate table, rather than a generic state-machine crate.

use anvil_types::entities::AssignmentStatus;

/// Whether `from -> to` is one of the five allowed edges 's
/// table. Preconditions beyond the state pair (caller identity, payload
/// validity, deadlines) are checked by the coordinator, not here.
pub fn can_transition(from: AssignmentStatus, to: AssignmentStatus) -> bool {
 use AssignmentStatus::*;
 matches!(
 (from, to),
 (Pending, InProgress)
 | (InProgress, Completed)
 | (InProgress, Skipped)
 | (Pending, Skipped)
 | (Pending, Expired)
 | (InProgress, Expired)
)
}

#[cfg(test)]
mod tests {
 use super::*;
 use AssignmentStatus::*;

 #[test]
 fn pending_to_in_progress_is_allowed() {
 assert!(can_transition(Pending, InProgress));
 }

 #[test]
 fn completed_is_terminal() {
 assert!(!can_transition(Completed, InProgress));
 assert!(!can_transition(Completed, Skipped));
 assert!(!can_transition(Completed, Expired));
 }

 #[test]
 fn pending_cannot_jump_to_completed() {
 assert!(!can_transition(Pending, Completed));
 }

 #[test]
 fn expired_cannot_resume() {
 assert!(!can_transition(Expired, InProgress));
 }
}
