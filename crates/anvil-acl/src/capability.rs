//! The capability table from, as a closed enum rather than free
//! strings, so a missing arm in [`crate::gate::required_roles`] is a
//! compile error.

use anvil_types::entities::MembershipRole;

/// An action the coordinator (or export engine) wants to perform on
/// behalf of a caller against one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
 RequestAssignment,
 Submit,
 Skip,
 ReadLabels,
 Export,
 ManageMemberships,
 ArchiveQueue,
}

impl Capability {
 /// The minimum active queue membership role its table
 /// requires, ordered by `MembershipRole`'s privilege: `Owner` always
 /// satisfies a `Reviewer` or `Labeler` requirement, and `Reviewer`
 /// always satisfies a `Labeler` requirement.
 pub fn minimum_role(self) -> MembershipRole {
 match self {
 Capability::RequestAssignment | Capability::Submit | Capability::Skip => {
 MembershipRole::Labeler
 }
 Capability::ReadLabels | Capability::Export => MembershipRole::Reviewer,
 Capability::ManageMemberships | Capability::ArchiveQueue => MembershipRole::Owner,
 }
 }
}

/// Privilege ordering used to compare a held role against a capability's
/// minimum. Matches : owner > reviewer > labeler.
pub fn role_rank(role: MembershipRole) -> u8 {
 match role {
 MembershipRole::Labeler => 0,
 MembershipRole::Reviewer => 1,
 MembershipRole::Owner => 2,
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn owner_outranks_reviewer_outranks_labeler() {
 assert!(role_rank(MembershipRole::Owner) > role_rank(MembershipRole::Reviewer));
 assert!(role_rank(MembershipRole::Reviewer) > role_rank(MembershipRole::Labeler));
 }

 #[test]
 fn export_requires_reviewer_or_owner() {
 assert_eq!(Capability::Export.minimum_role, MembershipRole::Reviewer);
 }
}
