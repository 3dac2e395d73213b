//! Escrow holds and their settlement state machine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BookingId, EscrowId, UserId};

/// Settlement state of an escrow hold.
///
/// Transitions: `HELD -> {RELEASED, PAUSED, REFUNDED}`,
/// `PAUSED -> {HELD, REFUNDED}`; `RELEASED` and `REFUNDED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    /// Funds held by the platform, pending release.
    Held,
    /// Funds released to the owner (minus the platform fee).
    Released,
    /// Release blocked while a dispute is open.
    Paused,
    /// Funds returned to the user.
    Refunded,
}

impl EscrowStatus {
    /// Whether the escrow reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Released | Self::Refunded)
    }

    /// Whether a refund may start from this state.
    #[must_use]
    pub const fn is_refundable(self) -> bool {
        matches!(self, Self::Held | Self::Paused)
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Held => "HELD",
            Self::Released => "RELEASED",
            Self::Paused => "PAUSED",
            Self::Refunded => "REFUNDED",
        };
        f.write_str(s)
    }
}

/// A per-booking payment hold.
///
/// Created exactly once per booking when its payment is captured;
/// `release_date` is the booking's end date plus one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escrow {
    /// Escrow id.
    pub id: EscrowId,
    /// The booking the funds are held for (unique per booking).
    pub booking_id: BookingId,
    /// The facility owner the funds will be released to.
    pub owner_id: UserId,
    /// Amount held, in minor currency units.
    pub amount_held: i64,
    /// Platform fee deducted at release.
    pub platform_fee: i64,
    /// Settlement state.
    pub status: EscrowStatus,
    /// Earliest date the sweep may release this hold.
    pub release_date: NaiveDate,
    /// When the hold was released, if it was.
    pub released_at: Option<DateTime<Utc>>,
}

impl Escrow {
    /// The amount paid out to the owner at release.
    #[must_use]
    pub const fn payout_amount(&self) -> i64 {
        self.amount_held - self.platform_fee
    }
}
