//! Escrow settlement state machine.
//!
//! Transitions: `HELD -> {RELEASED, PAUSED, REFUNDED}`,
//! `PAUSED -> {HELD, REFUNDED}`; `RELEASED`/`REFUNDED` terminal. Escrows
//! are created by payment reconciliation; release happens through the
//! scheduled sweep or an admin, refunds through cancellation, dispute
//! resolution, or an admin, and blocking through an admin.
//!
//! Refunds are optimistic: the escrow flips to REFUNDED and commits before
//! the gateway call, and a gateway failure writes the prior status back and
//! surfaces an internal error, leaving state consistent for an operator
//! retry.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use venuepass_core::{
    BookingId, BookingStatus, Escrow, EscrowError, EscrowId, EscrowStatus, PaymentEntityType,
    PaymentError, PaymentStatus,
};
use venuepass_store::lock_keys;

use crate::auth::Session;
use crate::error::ApiError;
use crate::state::AppState;

/// Release result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResponse {
    /// The released escrow.
    pub escrow_id: EscrowId,
    /// New status (always RELEASED).
    pub status: EscrowStatus,
    /// Amount paid out to the owner.
    pub payout_amount: i64,
    /// Fee retained by the platform.
    pub platform_fee: i64,
}

/// Refund result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    /// The refunded escrow.
    pub escrow_id: EscrowId,
    /// New status (always REFUNDED).
    pub status: EscrowStatus,
    /// Amount returned to the user.
    pub refund_amount: i64,
}

/// Block result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockResponse {
    /// The blocked escrow.
    pub escrow_id: EscrowId,
    /// New status (always PAUSED).
    pub status: EscrowStatus,
}

/// Fetch the escrow held for a booking (its owner, or an admin).
pub async fn get_by_booking(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(booking_id): Path<BookingId>,
) -> Result<Json<Escrow>, ApiError> {
    let escrow = state
        .store
        .get_escrow_by_booking(booking_id)?
        .ok_or(EscrowError::NotFound)?;
    if escrow.owner_id != session.user_id && !session.is_admin() {
        return Err(ApiError::Forbidden("escrow belongs to another owner".into()));
    }
    Ok(Json(escrow))
}

/// Force-release an escrow (admin).
pub async fn release(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(escrow_id): Path<EscrowId>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    session.ensure_admin()?;

    let _guard = state
        .locks
        .acquire(vec![lock_keys::escrow(escrow_id)])
        .await;
    let response = release_claimed(&state, escrow_id)?;
    Ok(Json(response))
}

/// Release an escrow whose row lock the caller already holds.
///
/// Refused unless the escrow is HELD, and refused while an active dispute
/// exists or the booking is DISPUTED. Used by the admin endpoint and the
/// scheduled sweep (which claims rows with a non-blocking try-lock).
pub(crate) fn release_claimed(
    state: &AppState,
    escrow_id: EscrowId,
) -> Result<ReleaseResponse, ApiError> {
    let mut escrow = state
        .store
        .get_escrow(escrow_id)?
        .ok_or(EscrowError::NotFound)?;
    if escrow.status != EscrowStatus::Held {
        return Err(EscrowError::NotReleasable {
            status: escrow.status,
        }
        .into());
    }

    if state
        .store
        .active_dispute_for_booking(escrow.booking_id)?
        .is_some()
    {
        return Err(EscrowError::DisputeActive.into());
    }
    let booking = state
        .store
        .get_booking(escrow.booking_id)?
        .ok_or(EscrowError::BookingNotFound)?;
    if booking.status == BookingStatus::Disputed {
        return Err(EscrowError::BookingDisputed.into());
    }

    escrow.status = EscrowStatus::Released;
    escrow.released_at = Some(Utc::now());
    let mut batch = state.store.batch();
    batch.put_escrow(&escrow)?;
    batch.commit()?;

    tracing::info!(
        escrow_id = %escrow_id,
        booking_id = %escrow.booking_id,
        payout_amount = %escrow.payout_amount(),
        "Escrow released"
    );

    Ok(ReleaseResponse {
        escrow_id,
        status: EscrowStatus::Released,
        payout_amount: escrow.payout_amount(),
        platform_fee: escrow.platform_fee,
    })
}

/// Refund an escrow to the user (admin).
///
/// No-op success when already refunded, so operators can safely re-drive a
/// refund whose gateway call was interrupted.
pub async fn refund(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(escrow_id): Path<EscrowId>,
) -> Result<Json<RefundResponse>, ApiError> {
    session.ensure_admin()?;

    // Pre-read to learn the payment lock key; re-validated under the locks.
    let preread = state
        .store
        .get_escrow(escrow_id)?
        .ok_or(EscrowError::NotFound)?;
    let mut keys_to_lock = vec![lock_keys::escrow(escrow_id)];
    if let Some(payment) = state.store.get_payment_by_entity(
        PaymentEntityType::Booking,
        &preread.booking_id.to_string(),
    )? {
        keys_to_lock.push(lock_keys::payment(&payment.gateway_order_id));
    }
    let _guard = state.locks.acquire(keys_to_lock).await;

    let mut escrow = state
        .store
        .get_escrow(escrow_id)?
        .ok_or(EscrowError::NotFound)?;

    if escrow.status == EscrowStatus::Refunded {
        return Ok(Json(RefundResponse {
            escrow_id,
            status: EscrowStatus::Refunded,
            refund_amount: escrow.amount_held,
        }));
    }
    if !escrow.status.is_refundable() {
        return Err(EscrowError::NotRefundable {
            status: escrow.status,
        }
        .into());
    }

    let payment = state
        .store
        .get_payment_by_entity(PaymentEntityType::Booking, &escrow.booking_id.to_string())?
        .ok_or(EscrowError::PaymentNotFound)?;
    if payment.status != PaymentStatus::Captured {
        return Err(PaymentError::NotRefundable {
            status: payment.status,
        }
        .into());
    }
    if payment.gateway_payment_id.is_none() {
        return Err(PaymentError::MissingGatewayPaymentId.into());
    }

    let prior_status = escrow.status;
    escrow.status = EscrowStatus::Refunded;
    let mut batch = state.store.batch();
    batch.put_escrow(&escrow)?;
    batch.commit()?;

    escrow.status = prior_status;
    execute_gateway_refund(&state, &escrow, prior_status, "Escrow refund").await?;

    tracing::info!(
        escrow_id = %escrow_id,
        refund_amount = %escrow.amount_held,
        "Escrow refunded"
    );

    Ok(Json(RefundResponse {
        escrow_id,
        status: EscrowStatus::Refunded,
        refund_amount: escrow.amount_held,
    }))
}

/// Block an escrow and force its booking into DISPUTED (admin).
pub async fn block(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(escrow_id): Path<EscrowId>,
) -> Result<Json<BlockResponse>, ApiError> {
    session.ensure_admin()?;

    let preread = state
        .store
        .get_escrow(escrow_id)?
        .ok_or(EscrowError::NotFound)?;
    let _guard = state
        .locks
        .acquire(vec![
            lock_keys::booking(preread.booking_id),
            lock_keys::escrow(escrow_id),
        ])
        .await;

    let mut escrow = state
        .store
        .get_escrow(escrow_id)?
        .ok_or(EscrowError::NotFound)?;
    if escrow.status.is_terminal() {
        return Err(EscrowError::NotBlockable {
            status: escrow.status,
        }
        .into());
    }

    let mut batch = state.store.batch();
    escrow.status = EscrowStatus::Paused;
    batch.put_escrow(&escrow)?;

    if let Some(mut booking) = state.store.get_booking(escrow.booking_id)? {
        if booking.status != BookingStatus::Disputed {
            booking.status = BookingStatus::Disputed;
            batch.put_booking(&booking)?;
        }
    }
    batch.commit()?;

    tracing::warn!(
        escrow_id = %escrow_id,
        booking_id = %escrow.booking_id,
        "Escrow blocked"
    );

    Ok(Json(BlockResponse {
        escrow_id,
        status: EscrowStatus::Paused,
    }))
}

/// Drive the gateway refund for an escrow already committed as REFUNDED.
///
/// The caller holds the escrow (and payment) row locks and passes the
/// escrow in its pre-flip state. A gateway failure writes `prior_status`
/// back and surfaces an internal error; a success marks the payment
/// REFUNDED with the gateway refund id recorded.
pub(crate) async fn execute_gateway_refund(
    state: &AppState,
    escrow: &Escrow,
    prior_status: EscrowStatus,
    reason: &str,
) -> Result<(), ApiError> {
    let payment = state
        .store
        .get_payment_by_entity(PaymentEntityType::Booking, &escrow.booking_id.to_string())?;
    let Some(mut payment) = payment else {
        // Nothing was ever captured; the refund is purely a ledger change.
        tracing::warn!(escrow_id = %escrow.id, "No payment to refund for escrow");
        return Ok(());
    };
    let Some(gateway_payment_id) = payment.gateway_payment_id.clone() else {
        tracing::warn!(escrow_id = %escrow.id, "Payment has no gateway payment id");
        return Ok(());
    };

    let Some(gateway) = state.gateway.clone() else {
        rollback_escrow(state, escrow, prior_status)?;
        return Err(ApiError::Internal("payment gateway not configured".into()));
    };

    match gateway
        .refund(&gateway_payment_id, escrow.amount_held, reason)
        .await
    {
        Ok(refund) => {
            payment.status = PaymentStatus::Refunded;
            payment.metadata["refundId"] = serde_json::Value::String(refund.id.clone());
            payment.updated_at = Utc::now();
            let mut batch = state.store.batch();
            batch.put_payment(&payment)?;
            batch.commit()?;

            tracing::info!(
                escrow_id = %escrow.id,
                refund_id = %refund.id,
                refund_status = %refund.status,
                "Gateway refund executed"
            );
            Ok(())
        }
        Err(e) => {
            rollback_escrow(state, escrow, prior_status)?;
            tracing::error!(
                escrow_id = %escrow.id,
                error = %e,
                "Gateway refund failed, escrow rolled back"
            );
            Err(ApiError::Internal(format!("refund execution failed: {e}")))
        }
    }
}

fn rollback_escrow(
    state: &AppState,
    escrow: &Escrow,
    prior_status: EscrowStatus,
) -> Result<(), ApiError> {
    let mut rolled_back = escrow.clone();
    rolled_back.status = prior_status;
    let mut batch = state.store.batch();
    batch.put_escrow(&rolled_back)?;
    batch.commit()?;
    Ok(())
}
