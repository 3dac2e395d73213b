//! Dispute creation and resolution.
//!
//! A dispute freezes the booking (DISPUTED) and pauses its escrow so the
//! release sweep cannot pay the owner while the dispute is open. Admin
//! resolution either refunds the user (escrow refund, booking cancelled,
//! trust up) or rejects the claim (escrow unblocked, booking restored,
//! trust down, repeated offenders flagged).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Timelike, Utc};
use serde::{Deserialize, Serialize};

use venuepass_core::{
    AccountStatus, BookingId, BookingStatus, Dispute, DisputeDecision, DisputeError, DisputeId,
    DisputeStatus, EscrowStatus, PaymentEntityType, FALSE_DISPUTE_THRESHOLD,
    TRUST_DELTA_REJECTED, TRUST_DELTA_UPHELD,
};
use venuepass_store::lock_keys;

use crate::auth::Session;
use crate::error::ApiError;
use crate::state::AppState;

/// Minutes after the slot window closes during which a dispute may still
/// be raised.
const DISPUTE_GRACE_MINUTES: u32 = 15;

/// Dispute creation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDisputeRequest {
    /// The disputed booking.
    pub booking_id: BookingId,
    /// The user's stated reason.
    pub reason: String,
}

/// Dispute creation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDisputeResponse {
    /// The new dispute.
    pub dispute_id: DisputeId,
    /// The disputed booking.
    pub booking_id: BookingId,
    /// Initial status (always SUBMITTED).
    pub status: DisputeStatus,
}

/// Dispute resolution request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDisputeRequest {
    /// The admin's decision.
    pub decision: DisputeDecision,
    /// The admin's note.
    #[serde(default)]
    pub note: Option<String>,
}

/// Dispute resolution response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDisputeResponse {
    /// The resolved dispute.
    pub dispute_id: DisputeId,
    /// Final status.
    pub status: DisputeStatus,
    /// The decision applied.
    pub decision: DisputeDecision,
}

/// Raise a dispute against a booking (user).
pub async fn create_dispute(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(body): Json<CreateDisputeRequest>,
) -> Result<Json<CreateDisputeResponse>, ApiError> {
    session.ensure_user()?;

    let escrow_preread = state.store.get_escrow_by_booking(body.booking_id)?;

    let mut keys_to_lock = vec![lock_keys::booking(body.booking_id)];
    if let Some(escrow) = &escrow_preread {
        keys_to_lock.push(lock_keys::escrow(escrow.id));
    }
    let _guard = state.locks.acquire(keys_to_lock).await;

    let mut booking = state
        .store
        .get_booking(body.booking_id)?
        .ok_or(DisputeError::BookingNotFound)?;
    if booking.user_id != session.user_id {
        return Err(DisputeError::WrongUser.into());
    }

    let facility = state
        .store
        .get_facility(booking.facility_id)?
        .ok_or_else(|| ApiError::NotFound("facility not found".into()))?;

    if !booking.status.is_consumable() {
        return Err(DisputeError::NotDisputable {
            status: booking.status,
        }
        .into());
    }
    if state
        .store
        .active_dispute_for_booking(booking.id)?
        .is_some()
    {
        return Err(DisputeError::AlreadyDisputed.into());
    }

    // Disputes are accepted during the slot window plus a short grace
    // period; a template without a parseable window imposes no restriction.
    if let Some(template) = state
        .store
        .get_template(booking.facility_id, booking.slot_type)?
    {
        if let Some((start, end)) = template.time_window_minutes() {
            let now = Utc::now();
            let now_minutes = now.hour() * 60 + now.minute();
            if now_minutes < start || now_minutes > end + DISPUTE_GRACE_MINUTES {
                return Err(DisputeError::OutsideSlotWindow.into());
            }
        }
    }

    if state.store.has_any_attendance(booking.id)? {
        return Err(DisputeError::AttendanceMarked.into());
    }

    let dispute = Dispute {
        id: DisputeId::generate(),
        booking_id: booking.id,
        user_id: session.user_id,
        owner_id: facility.owner_id,
        facility_id: facility.id,
        reason: body.reason,
        status: DisputeStatus::Submitted,
        admin_decision: None,
        refund_amount: None,
        created_at: Utc::now(),
    };

    let mut batch = state.store.batch();
    batch.put_dispute(&dispute)?;

    booking.status = BookingStatus::Disputed;
    batch.put_booking(&booking)?;

    if let Some(mut escrow) = state.store.get_escrow_by_booking(booking.id)? {
        if escrow.status == EscrowStatus::Held {
            escrow.status = EscrowStatus::Paused;
            batch.put_escrow(&escrow)?;
        }
    }
    batch.commit()?;

    tracing::warn!(
        dispute_id = %dispute.id,
        booking_id = %booking.id,
        user_id = %session.user_id,
        "Dispute raised"
    );

    Ok(Json(CreateDisputeResponse {
        dispute_id: dispute.id,
        booking_id: booking.id,
        status: DisputeStatus::Submitted,
    }))
}

/// Resolve a dispute (admin).
pub async fn resolve_dispute(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(dispute_id): Path<DisputeId>,
    Json(body): Json<ResolveDisputeRequest>,
) -> Result<Json<ResolveDisputeResponse>, ApiError> {
    session.ensure_admin()?;

    let preread = state
        .store
        .get_dispute(dispute_id)?
        .ok_or(DisputeError::NotFound)?;
    let escrow_preread = state.store.get_escrow_by_booking(preread.booking_id)?;

    let mut keys_to_lock = vec![
        lock_keys::booking(preread.booking_id),
        lock_keys::dispute(dispute_id),
    ];
    if let Some(escrow) = &escrow_preread {
        keys_to_lock.push(lock_keys::escrow(escrow.id));
        if let Some(payment) = state.store.get_payment_by_entity(
            PaymentEntityType::Booking,
            &preread.booking_id.to_string(),
        )? {
            keys_to_lock.push(lock_keys::payment(&payment.gateway_order_id));
        }
    }
    let _guard = state.locks.acquire(keys_to_lock).await;

    let mut dispute = state
        .store
        .get_dispute(dispute_id)?
        .ok_or(DisputeError::NotFound)?;
    if !dispute.status.is_active() {
        return Err(DisputeError::NotResolvable {
            status: dispute.status,
        }
        .into());
    }

    let escrow = state.store.get_escrow_by_booking(dispute.booking_id)?;
    let mut trust = state.store.get_trust(dispute.user_id)?;

    match body.decision {
        DisputeDecision::Refund => {
            dispute.status = DisputeStatus::ResolvedRefund;
            dispute.admin_decision = body.note.clone();
            dispute.refund_amount = escrow.as_ref().map(|e| e.amount_held);

            let mut batch = state.store.batch();
            batch.put_dispute(&dispute)?;

            if let Some(mut booking) = state.store.get_booking(dispute.booking_id)? {
                booking.status = BookingStatus::Cancelled;
                batch.put_booking(&booking)?;
            }

            trust.trust_score += TRUST_DELTA_UPHELD;
            batch.put_trust(&trust)?;

            // The escrow flips in the same commit; only the gateway call
            // runs after, with rollback on failure.
            let refund_plan = escrow.as_ref().filter(|e| e.status.is_refundable()).cloned();
            if let Some(escrow) = &refund_plan {
                let mut refunded = escrow.clone();
                refunded.status = EscrowStatus::Refunded;
                batch.put_escrow(&refunded)?;
            }
            batch.commit()?;

            if let Some(escrow) = refund_plan {
                crate::handlers::escrows::execute_gateway_refund(
                    &state,
                    &escrow,
                    escrow.status,
                    "Dispute resolved in user favor",
                )
                .await?;
            }
        }
        DisputeDecision::Reject => {
            dispute.status = DisputeStatus::ResolvedRejected;
            dispute.admin_decision = body.note.clone();

            let mut batch = state.store.batch();
            batch.put_dispute(&dispute)?;

            if let Some(mut booking) = state.store.get_booking(dispute.booking_id)? {
                if booking.status == BookingStatus::Disputed {
                    // Restore to ACTIVE while the pass window is still
                    // running, COMPLETED once it has passed.
                    booking.status = if Utc::now().date_naive() <= booking.end_date {
                        BookingStatus::Active
                    } else {
                        BookingStatus::Completed
                    };
                    batch.put_booking(&booking)?;
                }
            }

            if let Some(mut escrow) = escrow {
                if escrow.status == EscrowStatus::Paused {
                    escrow.status = EscrowStatus::Held;
                    batch.put_escrow(&escrow)?;
                }
            }

            trust.trust_score += TRUST_DELTA_REJECTED;
            trust.rejected_disputes += 1;
            if trust.rejected_disputes >= FALSE_DISPUTE_THRESHOLD
                && trust.account_status == AccountStatus::Active
            {
                trust.account_status = AccountStatus::UnderMonitoring;
                tracing::warn!(
                    user_id = %dispute.user_id,
                    rejected_disputes = %trust.rejected_disputes,
                    "Account flagged for monitoring after repeated rejected disputes"
                );
            }
            batch.put_trust(&trust)?;
            batch.commit()?;
        }
    }

    tracing::info!(
        dispute_id = %dispute_id,
        decision = ?body.decision,
        status = ?dispute.status,
        "Dispute resolved"
    );

    Ok(Json(ResolveDisputeResponse {
        dispute_id,
        status: dispute.status,
        decision: body.decision,
    }))
}
