//! Common test utilities for VenuePass integration tests.

#![allow(dead_code)] // Utilities are shared across test files with different needs

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestResponse, TestServer};
use chrono::{Duration, NaiveDate, Utc};
use tempfile::TempDir;

use venuepass_core::{
    BookingId, FacilityId, Payment, PaymentEntityType, PaymentId, PaymentStatus, TemplateId,
    UserId,
};
use venuepass_service::crypto::hmac_sha256_hex;
use venuepass_service::{create_router, AppState, ServiceConfig};
use venuepass_store::Store;

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const CREDENTIAL_SECRET: &str = "test-credential-secret";

/// Test harness: an in-process server over a fresh temp-dir store.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// A handle onto the same state the server runs on, for store
    /// assertions and direct sweep invocations.
    pub state: AppState,
    /// Temp directory backing the store (kept alive for the test).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Harness without a payment gateway (webhooks still work).
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Harness whose gateway client points at the given base URL
    /// (typically a wiremock server).
    pub fn with_gateway(gateway_url: &str) -> Self {
        let url = gateway_url.to_string();
        Self::with_config(move |config| {
            config.gateway_base_url = Some(url.clone());
        })
    }

    fn with_config(customize: impl Fn(&mut ServiceConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Store::open(temp_dir.path()).expect("Failed to open store");

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            gateway_key_id: Some("key_test".into()),
            gateway_key_secret: Some("secret_test".into()),
            webhook_secret: Some(WEBHOOK_SECRET.into()),
            credential_secret: CREDENTIAL_SECRET.into(),
            ..ServiceConfig::default()
        };
        customize(&mut config);

        let state = AppState::new(Arc::new(store), config);
        let server = TestServer::new(create_router(state.clone())).expect("Failed to create server");

        Self {
            server,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Sign a webhook body the way the gateway would.
    pub fn sign_webhook(&self, body: &str) -> String {
        hmac_sha256_hex(WEBHOOK_SECRET.as_bytes(), body.as_bytes())
    }

    /// Sync an APPROVED, published facility for `owner`.
    pub async fn seed_facility(&self, owner: UserId) -> FacilityId {
        self.seed_facility_with(owner, "APPROVED", true).await
    }

    /// Sync a facility with explicit approval/publication state.
    pub async fn seed_facility_with(
        &self,
        owner: UserId,
        approval_status: &str,
        is_published: bool,
    ) -> FacilityId {
        let facility_id = FacilityId::generate();
        let response = with_session(
            self.server.put(&format!("/v1/facilities/{facility_id}")),
            UserId::generate(),
            "ADMIN",
        )
        .json(&serde_json::json!({
            "ownerId": owner,
            "name": "Test Court",
            "approvalStatus": approval_status,
            "isPublished": is_published,
        }))
        .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        facility_id
    }

    /// Create a MORNING template covering `[today - 10, today + 30]` with
    /// an all-day slot window, priced for every pass duration.
    pub async fn seed_template(
        &self,
        owner: UserId,
        facility_id: FacilityId,
        capacity: u32,
    ) -> TemplateId {
        self.seed_template_window(
            owner,
            facility_id,
            capacity,
            today() - Duration::days(10),
            today() + Duration::days(30),
        )
        .await
    }

    /// Create a MORNING template with an explicit validity window.
    pub async fn seed_template_window(
        &self,
        owner: UserId,
        facility_id: FacilityId,
        capacity: u32,
        valid_from: NaiveDate,
        valid_till: NaiveDate,
    ) -> TemplateId {
        let response = with_session(self.server.post("/v1/slot-templates"), owner, "OWNER")
            .json(&serde_json::json!({
                "facilityId": facility_id,
                "slotType": "MORNING",
                "startTime": "00:00",
                "endTime": "23:59",
                "capacity": capacity,
                "price1Day": 100,
                "price3Day": 250,
                "price7Day": 500,
                "validFrom": valid_from,
                "validTill": valid_till,
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());
        response.json::<serde_json::Value>()["id"]
            .as_str()
            .expect("template id")
            .parse()
            .expect("template id parses")
    }

    /// Issue a booking request.
    pub async fn book(
        &self,
        user: UserId,
        facility_id: FacilityId,
        pass_days: u8,
        start_date: NaiveDate,
        idempotency_key: &str,
    ) -> TestResponse {
        with_session(self.server.post("/v1/bookings"), user, "USER")
            .add_header(
                HeaderName::from_static("idempotency-key"),
                HeaderValue::from_str(idempotency_key).expect("header value"),
            )
            .json(&serde_json::json!({
                "facilityId": facility_id,
                "slotType": "MORNING",
                "passDays": pass_days,
                "startDate": start_date,
            }))
            .await
    }

    /// Issue a booking request and assert success, returning the body.
    pub async fn book_ok(
        &self,
        user: UserId,
        facility_id: FacilityId,
        pass_days: u8,
        start_date: NaiveDate,
        idempotency_key: &str,
    ) -> serde_json::Value {
        let response = self
            .book(user, facility_id, pass_days, start_date, idempotency_key)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());
        response.json()
    }

    /// Store a PENDING payment for a booking, as order creation would.
    pub fn seed_payment(&self, booking_id: BookingId, amount: i64) -> String {
        let order_id = format!("order_{booking_id}");
        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::generate(),
            gateway_order_id: order_id.clone(),
            gateway_payment_id: None,
            entity_type: PaymentEntityType::Booking,
            entity_id: booking_id.to_string(),
            amount,
            currency: "INR".into(),
            method: None,
            status: PaymentStatus::Pending,
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        };
        let mut batch = self.state.store.batch();
        batch.put_payment(&payment).unwrap();
        batch.commit().unwrap();
        order_id
    }

    /// Deliver a signed `payment.captured` webhook.
    pub async fn deliver_captured(&self, order_id: &str, amount: i64) -> TestResponse {
        let body = serde_json::json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": {
                "order_id": order_id,
                "id": format!("pay_{order_id}"),
                "method": "upi",
                "amount": amount,
                "currency": "INR",
            }}},
        })
        .to_string();
        self.deliver_webhook(&body).await
    }

    /// Deliver a signed `payment.failed` webhook.
    pub async fn deliver_failed(&self, order_id: &str, amount: i64) -> TestResponse {
        let body = serde_json::json!({
            "event": "payment.failed",
            "payload": { "payment": { "entity": {
                "order_id": order_id,
                "id": format!("pay_{order_id}"),
                "method": "upi",
                "amount": amount,
                "currency": "INR",
            }}},
        })
        .to_string();
        self.deliver_webhook(&body).await
    }

    /// Deliver a raw webhook body with a valid signature.
    pub async fn deliver_webhook(&self, body: &str) -> TestResponse {
        self.server
            .post("/webhooks/payments")
            .add_header(
                HeaderName::from_static("x-gateway-signature"),
                HeaderValue::from_str(&self.sign_webhook(body)).expect("header value"),
            )
            .text(body.to_string())
            .await
    }

    /// Seed a payment and capture it, activating the booking and creating
    /// its escrow.
    pub async fn activate_booking(&self, booking_id: BookingId, amount: i64) -> String {
        let order_id = self.seed_payment(booking_id, amount);
        let response = self.deliver_captured(&order_id, amount).await;
        assert_eq!(response.status_code(), StatusCode::OK, "{}", response.text());
        order_id
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach resolved-session headers to a request.
pub fn with_session(request: TestRequest, user: UserId, role: &str) -> TestRequest {
    request
        .add_header(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_str(&user.to_string()).expect("header value"),
        )
        .add_header(
            HeaderName::from_static("x-user-role"),
            HeaderValue::from_str(role).expect("header value"),
        )
}

/// Today in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parse the booking id out of a creation response body.
pub fn booking_id_of(body: &serde_json::Value) -> BookingId {
    body["bookingId"]
        .as_str()
        .expect("bookingId present")
        .parse()
        .expect("bookingId parses")
}
