//! Booking and pass types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BookingId, FacilityId, SlotType, UserId};

/// Pass duration in bookable days.
///
/// Serialized as the bare day count (`1`, `3`, `7`); anything else is
/// rejected at the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PassDays {
    /// Single-day pass.
    One,
    /// Three-day pass.
    Three,
    /// Seven-day pass.
    Seven,
}

impl PassDays {
    /// Number of non-holiday days the pass entitles its holder to.
    #[must_use]
    pub const fn days(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Three => 3,
            Self::Seven => 7,
        }
    }

    /// The platform fee charged on top of the base price, in minor currency
    /// units. Fixed table: 1 day -> 2, 3 days -> 5, 7 days -> 7.
    #[must_use]
    pub const fn platform_fee(self) -> i64 {
        match self {
            Self::One => 2,
            Self::Three => 5,
            Self::Seven => 7,
        }
    }

    /// Parse a raw day count into a pass duration.
    #[must_use]
    pub const fn from_days(days: u8) -> Option<Self> {
        match days {
            1 => Some(Self::One),
            3 => Some(Self::Three),
            7 => Some(Self::Seven),
            _ => None,
        }
    }
}

impl TryFrom<u8> for PassDays {
    type Error = InvalidPassDays;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_days(value).ok_or(InvalidPassDays(value))
    }
}

impl From<PassDays> for u8 {
    fn from(pass: PassDays) -> Self {
        match pass {
            PassDays::One => 1,
            PassDays::Three => 3,
            PassDays::Seven => 7,
        }
    }
}

/// Rejection for day counts outside `{1, 3, 7}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid pass duration: {0} days")]
pub struct InvalidPassDays(pub u8);

/// Lifecycle state of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Created but not yet confirmed.
    Pending,
    /// Reserved; capacity is held, payment not yet captured.
    Accepted,
    /// Payment captured; the pass is usable.
    Active,
    /// Every pass day consumed.
    Completed,
    /// Cancelled before start; capacity released.
    Cancelled,
    /// Frozen by an open dispute.
    Disputed,
}

impl BookingStatus {
    /// States that count toward the one-live-booking-per-scope rule.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted | Self::Active)
    }

    /// States from which a user may cancel.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    /// States in which attendance can be recorded or a dispute raised.
    #[must_use]
    pub const fn is_consumable(self) -> bool {
        matches!(self, Self::Accepted | Self::Active)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Disputed => "DISPUTED",
        };
        f.write_str(s)
    }
}

/// A purchased multi-day pass for one facility slot.
///
/// `end_date` is the last consumed (non-holiday) date of the pass; the span
/// `[start_date, end_date]` can be longer than `pass_days` when holidays
/// fall inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking id.
    pub id: BookingId,
    /// The purchasing user.
    pub user_id: UserId,
    /// The booked facility.
    pub facility_id: FacilityId,
    /// The booked time-of-day slot.
    pub slot_type: SlotType,
    /// Pass duration.
    pub pass_days: PassDays,
    /// First pass date.
    pub start_date: NaiveDate,
    /// Last consumed pass date.
    pub end_date: NaiveDate,
    /// Pass days not yet consumed by attendance.
    pub active_days_remaining: u32,
    /// Base price, in minor currency units.
    pub base_amount: i64,
    /// Platform fee, in minor currency units.
    pub platform_fee: i64,
    /// `base_amount + platform_fee`.
    pub total_amount: i64,
    /// Lifecycle state.
    pub status: BookingStatus,
    /// The client-supplied idempotency key this booking was created under.
    pub idempotency_key: String,
    /// Signed pass credential presented at check-in.
    pub qr_code: String,
    /// When the booking was created.
    pub created_at: DateTime<Utc>,
}
