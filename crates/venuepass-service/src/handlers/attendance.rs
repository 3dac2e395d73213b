//! Attendance scanning and marking.
//!
//! Scanning is a read-only preview: it validates the pass credential and
//! reports whether check-in would succeed, without mutating anything. The
//! mutating action is separate and explicit, keyed by booking id, and runs
//! with the booking row locked so a day can never be consumed twice.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use venuepass_core::{
    Attendance, AttendanceError, Booking, BookingId, BookingStatus, Facility, SlotTemplate,
};
use venuepass_store::lock_keys;

use crate::auth::Session;
use crate::credential::PassCredential;
use crate::error::ApiError;
use crate::state::AppState;

/// Scan request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// The presented pass credential.
    pub qr_code: String,
}

/// Scan preview response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    /// The booking behind the credential.
    pub booking_id: BookingId,
    /// Facility display name.
    pub facility_name: String,
    /// The booked slot.
    pub slot_type: venuepass_core::SlotType,
    /// Slot window as "HH:MM - HH:MM", when the template defines one.
    pub slot_time: Option<String>,
    /// Pass duration in days.
    pub pass_days: u8,
    /// Pass days not yet consumed.
    pub active_days_remaining: u32,
    /// First pass date.
    pub start_date: NaiveDate,
    /// Last pass date.
    pub end_date: NaiveDate,
    /// Whether marking attendance now would succeed.
    pub can_mark_attendance: bool,
    /// Why not, when it would not.
    pub reason: Option<String>,
}

/// Mark request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    /// The booking to check in.
    pub booking_id: BookingId,
}

/// Mark response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkResponse {
    /// Confirmation message.
    pub message: String,
    /// Pass days left after this check-in.
    pub active_days_remaining: u32,
    /// Booking status after this check-in.
    pub booking_status: BookingStatus,
}

/// Preview a pass credential (owner). Does not mark attendance.
pub async fn scan(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(body): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    session.ensure_owner()?;

    let credential =
        PassCredential::decode(&body.qr_code, state.config.credential_secret.as_bytes())?;

    let booking = state
        .store
        .get_booking(credential.booking_id)?
        .ok_or(AttendanceError::BookingNotFound)?;
    if !booking.status.is_consumable() {
        return Err(AttendanceError::NotMarkable {
            status: booking.status,
        }
        .into());
    }

    let facility = owned_facility(&state, &booking, &session)?;
    if credential.facility_id != booking.facility_id {
        return Err(AttendanceError::FacilityMismatch.into());
    }

    let today = Utc::now().date_naive();
    if today < credential.valid_from || today > credential.valid_till {
        return Err(AttendanceError::OutsideValidity.into());
    }

    let template = state
        .store
        .get_template(booking.facility_id, booking.slot_type)?;
    let (slot_time, slot_time_ok) = slot_window_status(template.as_ref());

    let already_marked = state.store.attendance_exists(booking.id, today)?;

    let reason = if already_marked {
        Some("Attendance already marked for today".to_string())
    } else if !slot_time_ok {
        Some(format!(
            "Outside slot time window ({})",
            slot_time.as_deref().unwrap_or("unknown")
        ))
    } else if booking.active_days_remaining == 0 {
        Some("Pass has no active days remaining".to_string())
    } else {
        None
    };

    Ok(Json(ScanResponse {
        booking_id: booking.id,
        facility_name: facility.name,
        slot_type: booking.slot_type,
        slot_time,
        pass_days: booking.pass_days.into(),
        active_days_remaining: booking.active_days_remaining,
        start_date: booking.start_date,
        end_date: booking.end_date,
        can_mark_attendance: reason.is_none(),
        reason,
    }))
}

/// Record today's attendance for a booking (owner).
///
/// Consumes one pass day; the last day completes the booking.
pub async fn mark(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(body): Json<MarkRequest>,
) -> Result<Json<MarkResponse>, ApiError> {
    session.ensure_owner()?;

    let _guard = state
        .locks
        .acquire(vec![lock_keys::booking(body.booking_id)])
        .await;

    let mut booking = state
        .store
        .get_booking(body.booking_id)?
        .ok_or(AttendanceError::BookingNotFound)?;
    let facility = owned_facility(&state, &booking, &session)?;

    if !booking.status.is_consumable() {
        return Err(AttendanceError::NotMarkable {
            status: booking.status,
        }
        .into());
    }

    let today = Utc::now().date_naive();
    if state.store.is_holiday(facility.id, today)? {
        return Err(AttendanceError::Holiday.into());
    }
    if state.store.attendance_exists(booking.id, today)? {
        return Err(AttendanceError::AlreadyMarked.into());
    }
    if booking.active_days_remaining == 0 {
        return Err(AttendanceError::PassExhausted.into());
    }

    let mut batch = state.store.batch();
    batch.put_attendance(&Attendance {
        booking_id: booking.id,
        facility_id: facility.id,
        date: today,
        created_at: Utc::now(),
    })?;

    booking.active_days_remaining -= 1;
    if booking.active_days_remaining == 0 {
        booking.status = BookingStatus::Completed;
    }
    batch.put_booking(&booking)?;
    batch.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        facility_id = %facility.id,
        active_days_remaining = %booking.active_days_remaining,
        booking_status = %booking.status,
        "Attendance marked"
    );

    Ok(Json(MarkResponse {
        message: "Attendance marked successfully".into(),
        active_days_remaining: booking.active_days_remaining,
        booking_status: booking.status,
    }))
}

/// The slot window string and whether the current time falls inside it.
/// A template without a parseable window imposes no time restriction.
fn slot_window_status(template: Option<&SlotTemplate>) -> (Option<String>, bool) {
    let Some(template) = template else {
        return (None, true);
    };
    let Some((start, end)) = template.time_window_minutes() else {
        return (None, true);
    };

    let now = Utc::now();
    let now_minutes = now.hour() * 60 + now.minute();
    let label = format!("{} - {}", template.start_time, template.end_time);
    (Some(label), now_minutes >= start && now_minutes <= end)
}

fn owned_facility(
    state: &AppState,
    booking: &Booking,
    session: &Session,
) -> Result<Facility, ApiError> {
    let facility = state
        .store
        .get_facility(booking.facility_id)?
        .ok_or(AttendanceError::FacilityNotFound)?;
    if facility.owner_id != session.user_id {
        return Err(AttendanceError::WrongOwner.into());
    }
    Ok(facility)
}
