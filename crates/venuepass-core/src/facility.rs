//! Facility capability records.
//!
//! Facility CRUD and the approval workflow live in a separate service; this
//! engine keeps a synced capability record per facility so the booking core
//! can check bookability and ownership inside its own unit of work.

use serde::{Deserialize, Serialize};

use crate::{FacilityId, UserId};

/// Admin approval state of a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Awaiting admin review.
    Pending,
    /// Approved for publishing.
    Approved,
    /// Rejected by an admin.
    Rejected,
}

/// The slice of a facility this engine needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    /// Facility id.
    pub id: FacilityId,
    /// The owning user.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Admin approval state.
    pub approval_status: ApprovalStatus,
    /// Whether the owner has published the facility.
    pub is_published: bool,
}

impl Facility {
    /// Whether bookings may be created against this facility.
    #[must_use]
    pub fn is_bookable(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved && self.is_published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bookable_requires_approval_and_publication() {
        let mut facility = Facility {
            id: FacilityId::generate(),
            owner_id: UserId::generate(),
            name: "Court A".into(),
            approval_status: ApprovalStatus::Approved,
            is_published: true,
        };
        assert!(facility.is_bookable());

        facility.is_published = false;
        assert!(!facility.is_bookable());

        facility.is_published = true;
        facility.approval_status = ApprovalStatus::Pending;
        assert!(!facility.is_bookable());
    }
}
