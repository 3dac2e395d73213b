//! Payment records and owner subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{PaymentId, SubscriptionId, UserId};

/// Owner subscription price, in minor currency units.
pub const SUBSCRIPTION_AMOUNT: i64 = 99_900;

/// Owner subscription period length in days.
pub const SUBSCRIPTION_PERIOD_DAYS: i64 = 90;

/// Gateway-side state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Order created, capture not yet confirmed.
    Pending,
    /// Capture confirmed by the gateway webhook.
    Captured,
    /// Capture failed.
    Failed,
    /// Refunded through the gateway.
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Captured => "CAPTURED",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
        };
        f.write_str(s)
    }
}

/// What a payment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentEntityType {
    /// A user's booking.
    Booking,
    /// A facility owner's subscription.
    Subscription,
}

impl PaymentEntityType {
    /// Single-byte tag used in store key encodings.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Booking => 0,
            Self::Subscription => 1,
        }
    }
}

/// A gateway payment tracked through reconciliation.
///
/// `entity_id` is a string because subscription payments start bound to a
/// placeholder id and are rebound to the real subscription id once the
/// webhook creates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment id (time-ordered).
    pub id: PaymentId,
    /// Gateway order id (unique).
    pub gateway_order_id: String,
    /// Gateway payment id, set at capture.
    pub gateway_payment_id: Option<String>,
    /// What this payment pays for.
    pub entity_type: PaymentEntityType,
    /// The paid entity's id (or a placeholder before rebind).
    pub entity_id: String,
    /// Amount, in minor currency units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Payment method reported by the gateway, if any.
    pub method: Option<String>,
    /// Reconciliation state.
    pub status: PaymentStatus,
    /// Gateway receipts, notes, and refund ids.
    pub metadata: serde_json::Value,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

/// State of an owner subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Within the paid period.
    Active,
    /// Past the paid period.
    Expired,
}

/// A facility owner's platform subscription.
///
/// Created by payment reconciliation when a SUBSCRIPTION payment is
/// captured; plan management beyond that is outside this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Subscription id.
    pub id: SubscriptionId,
    /// The subscribing owner.
    pub owner_id: UserId,
    /// Period start.
    pub starts_at: DateTime<Utc>,
    /// Period end.
    pub expires_at: DateTime<Utc>,
    /// Subscription state.
    pub status: SubscriptionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_format() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Captured).unwrap(),
            "\"CAPTURED\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentEntityType::Subscription).unwrap(),
            "\"SUBSCRIPTION\""
        );
    }

    #[test]
    fn entity_type_tags_distinct() {
        assert_ne!(
            PaymentEntityType::Booking.tag(),
            PaymentEntityType::Subscription.tag()
        );
    }
}
