//! Booking creation and cancellation.
//!
//! Creation is a single locked unit of work: the consumed dates are planned
//! from the holiday table, the duplicate-scope, template, and capacity rows
//! are locked in one fixed-order acquisition, every check runs under those
//! locks, and all writes land in one atomic batch. A failure anywhere
//! commits nothing, so capacity is never partially incremented.
//!
//! Retried requests are neutralized by the idempotency record: the client
//! key is itself row-locked for the duration of the flow, so a concurrent
//! retry waits and then reads the cached response instead of re-executing.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;

use venuepass_core::{
    Booking, BookingError, BookingId, BookingStatus, EscrowStatus, FacilityId, Holiday, PassDays,
    SlotType,
};
use venuepass_store::lock_keys;

use crate::auth::Session;
use crate::credential::PassCredential;
use crate::error::ApiError;
use crate::state::AppState;

/// Attempts to re-plan the consumed dates when a concurrent holiday
/// mutation invalidates the plan between planning and locking.
const MAX_PLAN_ATTEMPTS: usize = 5;

/// Upper bound on the date walk, so a pathological holiday table cannot
/// spin the planner.
const MAX_WALK_DAYS: usize = 4000;

/// Booking creation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// The facility to book.
    pub facility_id: FacilityId,
    /// Time-of-day slot.
    pub slot_type: SlotType,
    /// Pass duration in days; only 1, 3, and 7 are sold.
    pub pass_days: u8,
    /// First pass date.
    pub start_date: NaiveDate,
}

/// Create a booking (user). Requires an `Idempotency-Key` header.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    session.ensure_user()?;

    let idempotency_key = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing Idempotency-Key header".into()))?
        .to_string();

    // Hold the key's row lock across the whole flow: a concurrent retry
    // with the same key parks here and then reads the cached response.
    let _idem_guard = state
        .locks
        .acquire(vec![lock_keys::idempotency(&idempotency_key)])
        .await;

    if let Some(cached) = state
        .store
        .get_idempotent(&idempotency_key, state.config.idempotency_ttl_seconds)?
    {
        tracing::debug!(idempotency_key = %idempotency_key, "Idempotent replay served from cache");
        return Ok(Json(cached));
    }

    let response = create_booking_tx(&state, &session, &body, &idempotency_key).await?;
    state
        .store
        .put_idempotent(&idempotency_key, &response, Utc::now())?;

    Ok(Json(response))
}

/// The locked unit of work behind booking creation.
async fn create_booking_tx(
    state: &AppState,
    session: &Session,
    body: &CreateBookingRequest,
    idempotency_key: &str,
) -> Result<serde_json::Value, ApiError> {
    let pass_days = PassDays::from_days(body.pass_days).ok_or(BookingError::InvalidPassDays)?;

    let facility = state
        .store
        .get_facility(body.facility_id)?
        .ok_or(BookingError::FacilityNotBookable)?;
    if !facility.is_bookable() {
        return Err(BookingError::FacilityNotBookable.into());
    }

    for _ in 0..MAX_PLAN_ATTEMPTS {
        // Plan the consumed dates from the holiday table, then lock scope,
        // template, and exactly those capacity rows. The plan is validated
        // again under the locks; a concurrent holiday change re-plans.
        let holidays = state.store.list_holidays(body.facility_id)?;
        let dates = plan_consumed_dates(body.start_date, pass_days, &holidays)?;

        let mut keys_to_lock = vec![
            lock_keys::booking_scope(session.user_id, body.facility_id, body.slot_type),
            lock_keys::template(body.facility_id, body.slot_type),
        ];
        keys_to_lock.extend(
            dates
                .iter()
                .map(|&date| lock_keys::capacity(body.facility_id, date, body.slot_type)),
        );
        let guard = state.locks.acquire(keys_to_lock).await;

        let holidays_now = state.store.list_holidays(body.facility_id)?;
        if plan_consumed_dates(body.start_date, pass_days, &holidays_now)? != dates {
            drop(guard);
            continue;
        }

        return reserve_dates(state, session, body, pass_days, &dates, idempotency_key);
    }

    Err(ApiError::Conflict(
        "facility holidays changed concurrently, retry the booking".into(),
    ))
}

/// Walk forward from the start date collecting one non-holiday date per
/// pass day. Holidays consume neither term nor capacity.
fn plan_consumed_dates(
    start_date: NaiveDate,
    pass_days: PassDays,
    holidays: &[Holiday],
) -> Result<Vec<NaiveDate>, ApiError> {
    let mut dates = Vec::with_capacity(pass_days.days() as usize);
    let mut cursor = start_date;

    for _ in 0..MAX_WALK_DAYS {
        if dates.len() == pass_days.days() as usize {
            return Ok(dates);
        }
        if !holidays.iter().any(|h| h.covers(cursor)) {
            dates.push(cursor);
        }
        cursor += Duration::days(1);
    }

    // Only reachable when holidays blanket years past the start date; no
    // real validity window extends that far.
    Err(BookingError::SlotOutsideValidity.into())
}

/// Validate and stage the reservation. Runs with the scope, template, and
/// capacity locks held.
fn reserve_dates(
    state: &AppState,
    session: &Session,
    body: &CreateBookingRequest,
    pass_days: PassDays,
    dates: &[NaiveDate],
    idempotency_key: &str,
) -> Result<serde_json::Value, ApiError> {
    if state
        .store
        .find_live_booking_in_scope(session.user_id, body.facility_id, body.slot_type)?
        .is_some()
    {
        return Err(BookingError::DuplicateActiveBooking.into());
    }

    let template = state
        .store
        .get_template(body.facility_id, body.slot_type)?
        .ok_or(BookingError::SlotTemplateNotFound)?;
    if !template.window_contains(body.start_date) {
        return Err(BookingError::SlotOutsideValidity.into());
    }
    let base_amount = template
        .price_for(pass_days)
        .ok_or(BookingError::PassNotSupported)?;

    let mut batch = state.store.batch();
    for &date in dates {
        let mut slot = state
            .store
            .get_capacity_slot(body.facility_id, date, body.slot_type)?
            .ok_or(BookingError::SlotNotGenerated { date })?;
        if slot.is_full() {
            return Err(BookingError::SlotFull { date }.into());
        }
        slot.booked += 1;
        batch.put_capacity_slot(&slot)?;
    }

    let end_date = dates
        .last()
        .copied()
        .ok_or_else(|| ApiError::Internal("empty reservation plan".into()))?;

    let platform_fee = pass_days.platform_fee();
    let total_amount = base_amount + platform_fee;
    let booking_id = BookingId::generate();

    let credential = PassCredential {
        booking_id,
        facility_id: body.facility_id,
        slot_type: body.slot_type,
        valid_from: body.start_date,
        valid_till: end_date,
    }
    .encode(state.config.credential_secret.as_bytes());

    let booking = Booking {
        id: booking_id,
        user_id: session.user_id,
        facility_id: body.facility_id,
        slot_type: body.slot_type,
        pass_days,
        start_date: body.start_date,
        end_date,
        active_days_remaining: pass_days.days(),
        base_amount,
        platform_fee,
        total_amount,
        status: BookingStatus::Accepted,
        idempotency_key: idempotency_key.to_string(),
        qr_code: credential.clone(),
        created_at: Utc::now(),
    };
    batch.put_booking(&booking)?;
    batch.commit()?;

    tracing::info!(
        booking_id = %booking_id,
        user_id = %session.user_id,
        facility_id = %body.facility_id,
        slot_type = ?body.slot_type,
        pass_days = %pass_days.days(),
        start_date = %body.start_date,
        end_date = %end_date,
        total_amount = %total_amount,
        "Booking created"
    );

    Ok(serde_json::json!({
        "bookingId": booking_id,
        "status": BookingStatus::Accepted,
        "startDate": body.start_date,
        "endDate": end_date,
        "activeDaysRemaining": pass_days.days(),
        "qrCode": credential,
    }))
}

/// Fetch a booking (its user, or an admin).
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(booking_id): Path<BookingId>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .store
        .get_booking(booking_id)?
        .ok_or(BookingError::NotFound)?;
    if booking.user_id != session.user_id && !session.is_admin() {
        return Err(BookingError::NotFound.into());
    }
    Ok(Json(booking))
}

/// Cancel a booking (user). Releases held capacity and reverses a held
/// escrow when cancellation lands before the pass starts.
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(booking_id): Path<BookingId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    session.ensure_user()?;

    // Pre-read to learn the lock set; everything is re-validated under the
    // locks.
    let preread = state
        .store
        .get_booking(booking_id)?
        .ok_or(BookingError::NotFound)?;
    if preread.user_id != session.user_id {
        return Err(BookingError::NotFound.into());
    }
    let escrow_preread = state.store.get_escrow_by_booking(booking_id)?;

    let mut keys_to_lock = vec![lock_keys::booking(booking_id)];
    let mut date = preread.start_date;
    while date <= preread.end_date {
        keys_to_lock.push(lock_keys::capacity(
            preread.facility_id,
            date,
            preread.slot_type,
        ));
        date += Duration::days(1);
    }
    if let Some(escrow) = &escrow_preread {
        keys_to_lock.push(lock_keys::escrow(escrow.id));
        if let Some(payment) = state
            .store
            .get_payment_by_entity(venuepass_core::PaymentEntityType::Booking, &booking_id.to_string())?
        {
            keys_to_lock.push(lock_keys::payment(&payment.gateway_order_id));
        }
    }
    let _guard = state.locks.acquire(keys_to_lock).await;

    let mut booking = state
        .store
        .get_booking(booking_id)?
        .ok_or(BookingError::NotFound)?;
    if booking.user_id != session.user_id {
        return Err(BookingError::NotFound.into());
    }
    if !booking.status.is_cancellable() {
        return Err(BookingError::NotCancellable {
            status: booking.status,
        }
        .into());
    }

    let today = Utc::now().date_naive();
    if today >= booking.start_date {
        return Err(BookingError::CancelAfterStart.into());
    }
    if state.store.has_any_attendance(booking_id)? {
        return Err(BookingError::CancelAfterAttendance.into());
    }

    // Mirror of the reservation walk: release one seat per non-holiday day.
    let holidays = state.store.list_holidays(booking.facility_id)?;
    let mut batch = state.store.batch();
    let mut date = booking.start_date;
    while date <= booking.end_date {
        if !holidays.iter().any(|h| h.covers(date)) {
            if let Some(mut slot) =
                state
                    .store
                    .get_capacity_slot(booking.facility_id, date, booking.slot_type)?
            {
                if slot.booked > 0 {
                    slot.booked -= 1;
                    batch.put_capacity_slot(&slot)?;
                }
            }
        }
        date += Duration::days(1);
    }

    booking.status = BookingStatus::Cancelled;
    batch.put_booking(&booking)?;

    // Escrow reversal shares this unit of work: a held escrow flips to
    // REFUNDED in the same commit, and only the gateway call runs after.
    let escrow = state.store.get_escrow_by_booking(booking_id)?;
    let refundable = escrow
        .as_ref()
        .is_some_and(|e| e.status == EscrowStatus::Held && Utc::now().date_naive() < booking.start_date);
    if let (Some(escrow), true) = (&escrow, refundable) {
        let mut refunded = escrow.clone();
        refunded.status = EscrowStatus::Refunded;
        batch.put_escrow(&refunded)?;
    }
    batch.commit()?;

    if let (Some(escrow), true) = (escrow, refundable) {
        crate::handlers::escrows::execute_gateway_refund(
            &state,
            &escrow,
            EscrowStatus::Held,
            "Booking cancelled before start date",
        )
        .await?;
        tracing::info!(
            booking_id = %booking_id,
            escrow_id = %escrow.id,
            refund_amount = %escrow.amount_held,
            "Escrow refunded on cancellation"
        );
    }

    tracing::info!(booking_id = %booking_id, user_id = %session.user_id, "Booking cancelled");

    Ok(Json(serde_json::json!({
        "message": "Booking cancelled successfully",
    })))
}
