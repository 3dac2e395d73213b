//! Payment gateway HTTP client.

use reqwest::Client;
use std::time::Duration;

use super::types::{CreateOrderRequest, GatewayErrorResponse, Order, Refund, RefundRequest};

/// Error type for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("gateway HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway returned an error response.
    #[error("gateway API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Client misconfiguration.
    #[error("gateway configuration error: {0}")]
    Configuration(String),
}

/// Payment gateway API client.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl GatewayClient {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    /// Create an order to be paid at checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the gateway rejects it.
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
        notes: serde_json::Value,
    ) -> Result<Order, GatewayError> {
        let url = format!("{}/v1/orders", self.base_url);
        let request = CreateOrderRequest {
            amount,
            currency: currency.to_string(),
            receipt: receipt.to_string(),
            notes,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Refund a captured payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the gateway rejects it.
    pub async fn refund(
        &self,
        gateway_payment_id: &str,
        amount: i64,
        reason: &str,
    ) -> Result<Refund, GatewayError> {
        let url = format!("{}/v1/payments/{gateway_payment_id}/refund", self.base_url);
        let request = RefundRequest {
            amount,
            notes: serde_json::json!({ "reason": reason }),
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<GatewayErrorResponse>().await {
            Ok(body) => body
                .error
                .description
                .or(body.error.code)
                .unwrap_or_else(|| "unknown gateway error".into()),
            Err(_) => "unknown gateway error".into(),
        };

        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
