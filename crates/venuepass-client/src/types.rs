//! Client request and response types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use venuepass_core::{BookingId, BookingStatus, FacilityId, SlotType};

/// Booking creation parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    /// The facility to book.
    pub facility_id: FacilityId,
    /// Time-of-day slot.
    pub slot_type: SlotType,
    /// Pass duration in days (1, 3, or 7).
    pub pass_days: u8,
    /// First pass date.
    pub start_date: NaiveDate,
}

/// A created (or idempotently replayed) booking.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreated {
    /// The booking id.
    pub booking_id: BookingId,
    /// Booking status (ACCEPTED on creation).
    pub status: BookingStatus,
    /// First pass date.
    pub start_date: NaiveDate,
    /// Last pass date.
    pub end_date: NaiveDate,
    /// Pass days not yet consumed.
    pub active_days_remaining: u32,
    /// The signed pass credential.
    pub qr_code: String,
}

/// Cancellation acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct Cancelled {
    /// Confirmation message.
    pub message: String,
}
