//! Payment orders and webhook reconciliation.
//!
//! Order creation happens before checkout; the gateway then confirms the
//! outcome through signed webhooks, delivered at least once. The captured
//! flow is idempotent end to end: the payment row is locked by gateway
//! order id, an already-captured payment is a no-op success, and the
//! booking activation plus escrow creation commit atomically with the
//! payment update, so a booking can never become ACTIVE without its escrow.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use venuepass_core::{
    BookingId, BookingStatus, Escrow, EscrowId, EscrowStatus, Payment, PaymentEntityType,
    PaymentError, PaymentId, PaymentStatus, Subscription, SubscriptionId, SubscriptionStatus,
    UserId, SUBSCRIPTION_AMOUNT, SUBSCRIPTION_PERIOD_DAYS,
};
use venuepass_store::lock_keys;

use crate::auth::Session;
use crate::crypto::{constant_time_eq, hmac_sha256_hex};
use crate::error::ApiError;
use crate::gateway::GatewayClient;
use crate::state::AppState;

/// Order creation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    /// Gateway order id to hand to the checkout widget.
    pub order_id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Gateway key id for the checkout widget.
    pub key_id: Option<String>,
}

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
}

/// Inbound webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    /// Event name (`payment.captured`, `payment.failed`).
    pub event: String,
    /// Event payload.
    pub payload: WebhookPayload,
}

/// Webhook payload container.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    /// Payment wrapper.
    pub payment: Option<PaymentWrapper>,
}

/// Payment entity wrapper.
#[derive(Debug, Deserialize)]
pub struct PaymentWrapper {
    /// The gateway's payment entity.
    pub entity: PaymentEntity,
}

/// The gateway's view of a payment.
#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    /// Gateway order id.
    pub order_id: String,
    /// Gateway payment id.
    pub id: String,
    /// Payment method, if reported.
    #[serde(default)]
    pub method: Option<String>,
    /// Amount in minor currency units.
    pub amount: i64,
    /// ISO currency code, if reported.
    #[serde(default)]
    pub currency: Option<String>,
}

/// Create a gateway order for a booking (user).
///
/// Returns the existing order when a non-captured payment already exists,
/// so checkout retries never create duplicate orders.
pub async fn create_order_for_booking(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(booking_id): Path<BookingId>,
) -> Result<Json<OrderResponse>, ApiError> {
    session.ensure_user()?;

    // The booking lock serializes concurrent order creation per booking.
    let _guard = state
        .locks
        .acquire(vec![lock_keys::booking(booking_id)])
        .await;

    let booking = state
        .store
        .get_booking(booking_id)?
        .filter(|b| b.user_id == session.user_id)
        .ok_or(PaymentError::BookingNotFound)?;
    if booking.status != BookingStatus::Accepted {
        return Err(PaymentError::BookingNotPayable {
            status: booking.status,
        }
        .into());
    }

    if let Some(existing) = state
        .store
        .get_payment_by_entity(PaymentEntityType::Booking, &booking_id.to_string())?
    {
        if existing.status == PaymentStatus::Captured {
            return Err(PaymentError::AlreadyCaptured.into());
        }
        return Ok(Json(OrderResponse {
            order_id: existing.gateway_order_id,
            amount: existing.amount,
            currency: existing.currency,
            key_id: state.config.gateway_key_id.clone(),
        }));
    }

    let gateway = require_gateway(&state)?;
    let receipt = format!("booking_{booking_id}");
    let notes = serde_json::json!({
        "bookingId": booking_id,
        "userId": session.user_id,
        "entityType": "BOOKING",
    });
    let order = gateway
        .create_order(booking.total_amount, &state.config.currency, &receipt, notes.clone())
        .await?;

    let now = Utc::now();
    let payment = Payment {
        id: PaymentId::generate(),
        gateway_order_id: order.id.clone(),
        gateway_payment_id: None,
        entity_type: PaymentEntityType::Booking,
        entity_id: booking_id.to_string(),
        amount: booking.total_amount,
        currency: state.config.currency.clone(),
        method: None,
        status: PaymentStatus::Pending,
        metadata: serde_json::json!({ "receipt": receipt, "notes": notes }),
        created_at: now,
        updated_at: now,
    };
    let mut batch = state.store.batch();
    batch.put_payment(&payment)?;
    batch.commit()?;

    tracing::info!(
        booking_id = %booking_id,
        order_id = %order.id,
        amount = %booking.total_amount,
        "Payment order created for booking"
    );

    Ok(Json(OrderResponse {
        order_id: order.id,
        amount: booking.total_amount,
        currency: state.config.currency.clone(),
        key_id: state.config.gateway_key_id.clone(),
    }))
}

/// Create a gateway order for an owner subscription (owner).
///
/// The payment starts bound to a placeholder entity id; reconciliation
/// creates the subscription and rebinds it on capture.
pub async fn create_order_for_subscription(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<OrderResponse>, ApiError> {
    session.ensure_owner()?;

    let gateway = require_gateway(&state)?;
    let receipt = format!("subscription_{}", session.user_id);
    let notes = serde_json::json!({
        "ownerId": session.user_id,
        "entityType": "SUBSCRIPTION",
    });
    let order = gateway
        .create_order(SUBSCRIPTION_AMOUNT, &state.config.currency, &receipt, notes.clone())
        .await?;

    let now = Utc::now();
    let placeholder = format!("temp_{}_{}", session.user_id, now.timestamp_millis());
    let payment = Payment {
        id: PaymentId::generate(),
        gateway_order_id: order.id.clone(),
        gateway_payment_id: None,
        entity_type: PaymentEntityType::Subscription,
        entity_id: placeholder,
        amount: SUBSCRIPTION_AMOUNT,
        currency: state.config.currency.clone(),
        method: None,
        status: PaymentStatus::Pending,
        metadata: serde_json::json!({
            "receipt": receipt,
            "notes": notes,
            "ownerId": session.user_id,
        }),
        created_at: now,
        updated_at: now,
    };
    let mut batch = state.store.batch();
    batch.put_payment(&payment)?;
    batch.commit()?;

    tracing::info!(
        owner_id = %session.user_id,
        order_id = %order.id,
        "Payment order created for subscription"
    );

    Ok(Json(OrderResponse {
        order_id: order.id,
        amount: SUBSCRIPTION_AMOUNT,
        currency: state.config.currency.clone(),
        key_id: state.config.gateway_key_id.clone(),
    }))
}

/// Handle a signed gateway webhook.
///
/// The HMAC-SHA256 signature is verified over the exact raw body bytes,
/// with a constant-time compare, before anything is parsed; a missing or
/// invalid signature is rejected with no side effects.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get("x-gateway-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing gateway signature".into()))?;

    let secret = state
        .config
        .webhook_secret
        .as_ref()
        .ok_or_else(|| ApiError::Internal("webhook secret not configured".into()))?;

    let expected = hmac_sha256_hex(secret.as_bytes(), &body);
    if !constant_time_eq(&expected, signature) {
        tracing::warn!("Invalid webhook signature");
        return Err(ApiError::Unauthorized);
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid webhook body: {e}")))?;

    tracing::info!(event = %event.event, "Received payment webhook");

    match event.event.as_str() {
        "payment.captured" => handle_payment_captured(&state, &event).await?,
        "payment.failed" => handle_payment_failed(&state, &event).await?,
        other => {
            tracing::debug!(event = %other, "Unhandled webhook event");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

/// Reconcile a captured payment: mark it CAPTURED and, for bookings,
/// activate the booking and create its escrow in the same commit; for
/// subscriptions, create the subscription and rebind the payment.
async fn handle_payment_captured(state: &AppState, event: &WebhookEvent) -> Result<(), ApiError> {
    let entity = payment_entity(event)?;

    let preread = state
        .store
        .get_payment_by_order(&entity.order_id)?
        .ok_or_else(|| PaymentError::OrderNotFound {
            order_id: entity.order_id.clone(),
        })?;

    let mut keys_to_lock = vec![lock_keys::payment(&entity.order_id)];
    if preread.entity_type == PaymentEntityType::Booking {
        if let Ok(booking_id) = preread.entity_id.parse::<BookingId>() {
            keys_to_lock.push(lock_keys::booking(booking_id));
        }
    }
    let _guard = state.locks.acquire(keys_to_lock).await;

    let mut payment = state
        .store
        .get_payment_by_order(&entity.order_id)?
        .ok_or_else(|| PaymentError::OrderNotFound {
            order_id: entity.order_id.clone(),
        })?;

    if payment.status == PaymentStatus::Captured {
        tracing::info!(order_id = %entity.order_id, "Payment already captured, no-op");
        return Ok(());
    }

    let reported_currency = entity
        .currency
        .clone()
        .unwrap_or_else(|| state.config.currency.clone());
    if payment.amount != entity.amount {
        return Err(PaymentError::AmountMismatch {
            stored: payment.amount,
            reported: entity.amount,
        }
        .into());
    }
    if payment.currency != reported_currency {
        return Err(PaymentError::CurrencyMismatch {
            stored: payment.currency.clone(),
            reported: reported_currency,
        }
        .into());
    }

    payment.status = PaymentStatus::Captured;
    payment.gateway_payment_id = Some(entity.id.clone());
    payment.method = entity.method.clone();
    payment.metadata["capture"] = serde_json::json!({
        "paymentId": entity.id,
        "method": entity.method,
    });
    payment.updated_at = Utc::now();

    let mut batch = state.store.batch();
    match payment.entity_type {
        PaymentEntityType::Booking => {
            let booking_id: BookingId = payment
                .entity_id
                .parse()
                .map_err(|_| PaymentError::BookingNotFound)?;
            let mut booking = state
                .store
                .get_booking(booking_id)?
                .ok_or(PaymentError::BookingNotFound)?;

            if booking.status == BookingStatus::Active {
                // Redelivered after a completed transition; just persist
                // the payment capture.
                batch.put_payment(&payment)?;
                batch.commit()?;
                tracing::info!(booking_id = %booking_id, "Booking already active, no-op");
                return Ok(());
            }
            if booking.status != BookingStatus::Accepted {
                return Err(PaymentError::BookingNotPayable {
                    status: booking.status,
                }
                .into());
            }

            booking.status = BookingStatus::Active;
            batch.put_payment(&payment)?;
            batch.put_booking(&booking)?;

            if state.store.get_escrow_by_booking(booking_id)?.is_none() {
                match state.store.get_facility(booking.facility_id)? {
                    Some(facility) => {
                        let escrow = Escrow {
                            id: EscrowId::generate(),
                            booking_id,
                            owner_id: facility.owner_id,
                            amount_held: booking.total_amount,
                            platform_fee: booking.platform_fee,
                            status: EscrowStatus::Held,
                            release_date: booking.end_date + Duration::days(1),
                            released_at: None,
                        };
                        batch.put_escrow(&escrow)?;
                        tracing::info!(
                            booking_id = %booking_id,
                            escrow_id = %escrow.id,
                            amount_held = %escrow.amount_held,
                            release_date = %escrow.release_date,
                            "Escrow created for captured payment"
                        );
                    }
                    None => {
                        tracing::warn!(
                            booking_id = %booking_id,
                            facility_id = %booking.facility_id,
                            "Facility record missing, escrow not created"
                        );
                    }
                }
            }
            batch.commit()?;

            tracing::info!(
                booking_id = %booking_id,
                order_id = %entity.order_id,
                "Booking activated by payment capture"
            );
        }
        PaymentEntityType::Subscription => {
            let owner_id: UserId = payment
                .metadata
                .get("ownerId")
                .and_then(|v| v.as_str())
                .and_then(|v| v.parse().ok())
                .ok_or(PaymentError::MissingOwnerMetadata)?;

            let now = Utc::now();
            let subscription = Subscription {
                id: SubscriptionId::generate(),
                owner_id,
                starts_at: now,
                expires_at: now + Duration::days(SUBSCRIPTION_PERIOD_DAYS),
                status: SubscriptionStatus::Active,
            };
            batch.put_subscription(&subscription)?;

            // Rebind the payment from its placeholder to the real
            // subscription id.
            let placeholder = payment.entity_id.clone();
            payment.entity_id = subscription.id.to_string();
            batch.remove_payment_entity_index(PaymentEntityType::Subscription, &placeholder)?;
            batch.put_payment(&payment)?;
            batch.commit()?;

            tracing::info!(
                owner_id = %owner_id,
                subscription_id = %subscription.id,
                order_id = %entity.order_id,
                "Subscription created by payment capture"
            );
        }
    }

    Ok(())
}

/// Idempotently record a failed payment.
async fn handle_payment_failed(state: &AppState, event: &WebhookEvent) -> Result<(), ApiError> {
    let entity = payment_entity(event)?;

    let _guard = state
        .locks
        .acquire(vec![lock_keys::payment(&entity.order_id)])
        .await;

    let mut payment = state
        .store
        .get_payment_by_order(&entity.order_id)?
        .ok_or_else(|| PaymentError::OrderNotFound {
            order_id: entity.order_id.clone(),
        })?;

    if matches!(
        payment.status,
        PaymentStatus::Failed | PaymentStatus::Captured
    ) {
        tracing::info!(order_id = %entity.order_id, "Payment status already settled, no-op");
        return Ok(());
    }

    payment.status = PaymentStatus::Failed;
    payment.gateway_payment_id = Some(entity.id.clone());
    payment.method = entity.method.clone();
    payment.updated_at = Utc::now();

    let mut batch = state.store.batch();
    batch.put_payment(&payment)?;
    batch.commit()?;

    tracing::warn!(order_id = %entity.order_id, "Payment failure recorded");
    Ok(())
}

fn payment_entity(event: &WebhookEvent) -> Result<&PaymentEntity, ApiError> {
    event
        .payload
        .payment
        .as_ref()
        .map(|p| &p.entity)
        .ok_or_else(|| PaymentError::InvalidPayload.into())
}

fn require_gateway(state: &AppState) -> Result<Arc<GatewayClient>, ApiError> {
    state
        .gateway
        .clone()
        .ok_or_else(|| ApiError::Internal("payment gateway not configured".into()))
}
