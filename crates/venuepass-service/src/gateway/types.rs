//! Gateway API wire types.

use serde::{Deserialize, Serialize};

/// Order creation request body.
#[derive(Debug, Serialize)]
pub struct CreateOrderRequest {
    /// Amount in minor currency units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Merchant receipt reference.
    pub receipt: String,
    /// Free-form notes echoed back by the gateway.
    pub notes: serde_json::Value,
}

/// A gateway order.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    /// Gateway order id.
    pub id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
}

/// Refund request body.
#[derive(Debug, Serialize)]
pub struct RefundRequest {
    /// Amount to refund in minor currency units.
    pub amount: i64,
    /// Free-form notes.
    pub notes: serde_json::Value,
}

/// A gateway refund.
#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    /// Gateway refund id.
    pub id: String,
    /// Refund status reported by the gateway.
    pub status: String,
}

/// Error body returned by the gateway.
#[derive(Debug, Deserialize)]
pub struct GatewayErrorResponse {
    /// Error envelope.
    pub error: GatewayErrorBody,
}

/// Error details returned by the gateway.
#[derive(Debug, Deserialize)]
pub struct GatewayErrorBody {
    /// Machine-readable code, if any.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}
