//! Disputes and the user trust ledger they feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BookingId, DisputeId, FacilityId, UserId};

/// Rejected disputes after which an account is flagged for monitoring.
pub const FALSE_DISPUTE_THRESHOLD: u32 = 3;

/// Trust score delta when a dispute is resolved in the user's favor.
pub const TRUST_DELTA_UPHELD: i64 = 5;

/// Trust score delta when a dispute is rejected.
pub const TRUST_DELTA_REJECTED: i64 = -10;

/// Lifecycle state of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    /// Raised by the user, awaiting review.
    Submitted,
    /// Picked up by an admin.
    UnderReview,
    /// Resolved in the user's favor; escrow refunded.
    ResolvedRefund,
    /// Resolved in the owner's favor; escrow unblocked.
    ResolvedRejected,
}

impl DisputeStatus {
    /// Whether the dispute still blocks escrow release.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Submitted | Self::UnderReview)
    }
}

/// Admin resolution decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeDecision {
    /// Refund the user.
    Refund,
    /// Reject the dispute.
    Reject,
}

/// A user-raised dispute against a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    /// Dispute id.
    pub id: DisputeId,
    /// The disputed booking.
    pub booking_id: BookingId,
    /// The user who raised it.
    pub user_id: UserId,
    /// The facility owner on the other side.
    pub owner_id: UserId,
    /// The facility involved.
    pub facility_id: FacilityId,
    /// The user's stated reason.
    pub reason: String,
    /// Lifecycle state.
    pub status: DisputeStatus,
    /// The admin's resolution note, once resolved.
    pub admin_decision: Option<String>,
    /// Amount refunded, when resolved in the user's favor.
    pub refund_amount: Option<i64>,
    /// When the dispute was raised.
    pub created_at: DateTime<Utc>,
}

/// Standing of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// In good standing.
    Active,
    /// Flagged after repeated rejected disputes.
    UnderMonitoring,
}

/// Per-user trust ledger maintained by dispute resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTrust {
    /// The user this ledger belongs to.
    pub user_id: UserId,
    /// Running trust score.
    pub trust_score: i64,
    /// Account standing.
    pub account_status: AccountStatus,
    /// Lifetime count of rejected disputes.
    pub rejected_disputes: u32,
}

impl UserTrust {
    /// A fresh ledger for a user with no dispute history.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            trust_score: 0,
            account_status: AccountStatus::Active,
            rejected_disputes: 0,
        }
    }
}
