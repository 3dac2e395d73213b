//! Attendance records: one check-in per booking per day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{BookingId, FacilityId};

/// A recorded check-in, unique per `(booking, date)`.
///
/// Each record consumes one pass day; the pass completes when the last day
/// is consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    /// The booking checked in against.
    pub booking_id: BookingId,
    /// The facility the check-in happened at.
    pub facility_id: FacilityId,
    /// The consumed date.
    pub date: NaiveDate,
    /// When the check-in was recorded.
    pub created_at: DateTime<Utc>,
}
