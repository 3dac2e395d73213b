//! HTTP client implementation.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use venuepass_core::{Booking, BookingId, UserId};

use crate::error::ClientError;
use crate::types::{BookingCreated, Cancelled, CreateBooking};

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Client for the VenuePass booking API.
///
/// Requests carry the resolved session headers the service trusts; callers
/// supply the acting user per call.
#[derive(Debug, Clone)]
pub struct VenuePassClient {
    client: Client,
    base_url: String,
}

impl VenuePassClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a booking on behalf of a user.
    ///
    /// The idempotency key makes retries safe: replays return the original
    /// response without reserving capacity again.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects it.
    pub async fn create_booking(
        &self,
        user_id: UserId,
        booking: CreateBooking,
        idempotency_key: &str,
    ) -> Result<BookingCreated, ClientError> {
        let url = format!("{}/v1/bookings", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-user-id", user_id.to_string())
            .header("x-user-role", "USER")
            .header("idempotency-key", idempotency_key)
            .json(&booking)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Fetch a booking.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects it.
    pub async fn get_booking(
        &self,
        user_id: UserId,
        booking_id: BookingId,
    ) -> Result<Booking, ClientError> {
        let url = format!("{}/v1/bookings/{booking_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-user-id", user_id.to_string())
            .header("x-user-role", "USER")
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Cancel a booking.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects it.
    pub async fn cancel_booking(
        &self,
        user_id: UserId,
        booking_id: BookingId,
    ) -> Result<Cancelled, ClientError> {
        let url = format!("{}/v1/bookings/{booking_id}/cancel", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-user-id", user_id.to_string())
            .header("x-user-role", "USER")
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        match response.json::<ErrorResponse>().await {
            Ok(body) => Err(ClientError::Api {
                code: body.error.code,
                message: body.error.message,
                status: status.as_u16(),
            }),
            Err(_) => Err(ClientError::Api {
                code: "unknown".into(),
                message: unexpected_status_message(status),
                status: status.as_u16(),
            }),
        }
    }
}

fn unexpected_status_message(status: StatusCode) -> String {
    format!(
        "unexpected response: {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    )
}
