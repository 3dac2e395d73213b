//! Escrow state machine and release sweep.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use venuepass_core::{BookingId, BookingStatus, EscrowId, EscrowStatus, PaymentStatus, UserId};
use venuepass_service::sweep;

use common::{booking_id_of, today, with_session, TestHarness};

/// Book a 1-day pass (base 100 + fee 2) and activate it; returns
/// `(booking_id, escrow_id)`.
async fn activated_booking(
    harness: &TestHarness,
    facility: venuepass_core::FacilityId,
    user: UserId,
    start: chrono::NaiveDate,
    key: &str,
) -> (BookingId, EscrowId) {
    let body = harness.book_ok(user, facility, 1, start, key).await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 102).await;
    let escrow = harness
        .state
        .store
        .get_escrow_by_booking(booking_id)
        .unwrap()
        .unwrap();
    (booking_id, escrow.id)
}

#[tokio::test]
async fn sweep_releases_due_escrows() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    // A pass that ended days ago is past its release date.
    let (booking_id, escrow_id) = activated_booking(
        &harness,
        facility,
        UserId::generate(),
        today() - Duration::days(5),
        "due-1",
    )
    .await;

    let stats = sweep::run_escrow_release_once(&harness.state).await;
    assert_eq!(stats.released, 1);
    assert_eq!(stats.failed, 0);

    let escrow = harness.state.store.get_escrow(escrow_id).unwrap().unwrap();
    assert_eq!(escrow.status, EscrowStatus::Released);
    assert!(escrow.released_at.is_some());

    // Released escrows leave the queue; a second pass finds nothing.
    let again = sweep::run_escrow_release_once(&harness.state).await;
    assert_eq!(again.released, 0);
    assert_eq!(again.skipped, 0);

    // The booking itself is untouched by release.
    let booking = harness.state.store.get_booking(booking_id).unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Active);
}

#[tokio::test]
async fn sweep_ignores_undue_escrows() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let (_, escrow_id) = activated_booking(
        &harness,
        facility,
        UserId::generate(),
        today() + Duration::days(5),
        "undue-1",
    )
    .await;

    let stats = sweep::run_escrow_release_once(&harness.state).await;
    assert_eq!(stats.released, 0);

    let escrow = harness.state.store.get_escrow(escrow_id).unwrap().unwrap();
    assert_eq!(escrow.status, EscrowStatus::Held);
}

#[tokio::test]
async fn sweep_skips_rows_claimed_elsewhere() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let (_, escrow_id) = activated_booking(
        &harness,
        facility,
        UserId::generate(),
        today() - Duration::days(5),
        "claimed-1",
    )
    .await;

    // Another worker holds the row; the sweep must skip without blocking.
    let guard = harness
        .state
        .locks
        .acquire(vec![venuepass_store::lock_keys::escrow(escrow_id)])
        .await;
    let stats = sweep::run_escrow_release_once(&harness.state).await;
    assert_eq!(stats.released, 0);
    assert_eq!(stats.skipped, 1);
    assert_eq!(
        harness.state.store.get_escrow(escrow_id).unwrap().unwrap().status,
        EscrowStatus::Held
    );

    drop(guard);
    let stats = sweep::run_escrow_release_once(&harness.state).await;
    assert_eq!(stats.released, 1);
}

#[tokio::test]
async fn release_is_refused_for_disputed_bookings() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let (booking_id, escrow_id) = activated_booking(
        &harness,
        facility,
        UserId::generate(),
        today() - Duration::days(5),
        "disputed-release",
    )
    .await;

    // Freeze the booking while leaving the escrow HELD, as an admin block
    // on a sibling system would.
    let mut booking = harness.state.store.get_booking(booking_id).unwrap().unwrap();
    booking.status = BookingStatus::Disputed;
    let mut batch = harness.state.store.batch();
    batch.put_booking(&booking).unwrap();
    batch.commit().unwrap();

    let response = with_session(
        harness
            .server
            .post(&format!("/v1/escrows/{escrow_id}/release")),
        UserId::generate(),
        "ADMIN",
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    // The sweep treats it as skippable, not as a failure.
    let stats = sweep::run_escrow_release_once(&harness.state).await;
    assert_eq!(stats.released, 0);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn admin_release_pays_out_held_escrow() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let (_, escrow_id) = activated_booking(
        &harness,
        facility,
        UserId::generate(),
        today() + Duration::days(1),
        "admin-release",
    )
    .await;

    let response = with_session(
        harness
            .server
            .post(&format!("/v1/escrows/{escrow_id}/release")),
        UserId::generate(),
        "ADMIN",
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["status"], "RELEASED");
    assert_eq!(body["payoutAmount"], 100);
    assert_eq!(body["platformFee"], 2);

    // Terminal: a second release conflicts.
    let again = with_session(
        harness
            .server
            .post(&format!("/v1/escrows/{escrow_id}/release")),
        UserId::generate(),
        "ADMIN",
    )
    .await;
    assert_eq!(again.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn block_pauses_escrow_and_disputes_booking() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let (booking_id, escrow_id) = activated_booking(
        &harness,
        facility,
        UserId::generate(),
        today() - Duration::days(5),
        "block-1",
    )
    .await;

    let response = with_session(
        harness.server.post(&format!("/v1/escrows/{escrow_id}/block")),
        UserId::generate(),
        "ADMIN",
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let escrow = harness.state.store.get_escrow(escrow_id).unwrap().unwrap();
    assert_eq!(escrow.status, EscrowStatus::Paused);
    let booking = harness.state.store.get_booking(booking_id).unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Disputed);

    // A paused escrow never releases, even past its release date.
    let stats = sweep::run_escrow_release_once(&harness.state).await;
    assert_eq!(stats.released, 0);
}

#[tokio::test]
async fn refund_of_refunded_escrow_is_a_noop_success() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let (_, escrow_id) = activated_booking(
        &harness,
        facility,
        UserId::generate(),
        today() + Duration::days(1),
        "refund-noop",
    )
    .await;

    let mut escrow = harness.state.store.get_escrow(escrow_id).unwrap().unwrap();
    escrow.status = EscrowStatus::Refunded;
    let mut batch = harness.state.store.batch();
    batch.put_escrow(&escrow).unwrap();
    batch.commit().unwrap();

    let response = with_session(
        harness
            .server
            .post(&format!("/v1/escrows/{escrow_id}/refund")),
        UserId::generate(),
        "ADMIN",
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<serde_json::Value>()["status"], "REFUNDED");
}

#[tokio::test]
async fn refund_failure_rolls_escrow_back() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/payments/.+/refund$"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": { "code": "SERVER_ERROR", "description": "internal error" }
        })))
        .mount(&gateway)
        .await;

    let harness = TestHarness::with_gateway(&gateway.uri());
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let (_, escrow_id) = activated_booking(
        &harness,
        facility,
        UserId::generate(),
        today() + Duration::days(1),
        "refund-fail",
    )
    .await;

    let response = with_session(
        harness
            .server
            .post(&format!("/v1/escrows/{escrow_id}/refund")),
        UserId::generate(),
        "ADMIN",
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    // The optimistic flip was rolled back; the operator can retry.
    let escrow = harness.state.store.get_escrow(escrow_id).unwrap().unwrap();
    assert_eq!(escrow.status, EscrowStatus::Held);
}

#[tokio::test]
async fn refund_success_marks_payment_refunded() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/payments/.+/refund$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "rfnd_1",
            "status": "processed",
        })))
        .mount(&gateway)
        .await;

    let harness = TestHarness::with_gateway(&gateway.uri());
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let (booking_id, escrow_id) = activated_booking(
        &harness,
        facility,
        UserId::generate(),
        today() + Duration::days(1),
        "refund-ok",
    )
    .await;

    let response = with_session(
        harness
            .server
            .post(&format!("/v1/escrows/{escrow_id}/refund")),
        UserId::generate(),
        "ADMIN",
    )
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["status"], "REFUNDED");
    assert_eq!(body["refundAmount"], 102);

    let escrow = harness.state.store.get_escrow(escrow_id).unwrap().unwrap();
    assert_eq!(escrow.status, EscrowStatus::Refunded);

    let payment = harness
        .state
        .store
        .get_payment_by_entity(
            venuepass_core::PaymentEntityType::Booking,
            &booking_id.to_string(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);
    assert_eq!(payment.metadata["refundId"], "rfnd_1");
}

#[tokio::test]
async fn escrow_read_model_is_owner_scoped() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let (booking_id, _) = activated_booking(
        &harness,
        facility,
        UserId::generate(),
        today() + Duration::days(1),
        "read-1",
    )
    .await;

    let own = with_session(
        harness
            .server
            .get(&format!("/v1/escrows/by-booking/{booking_id}")),
        owner,
        "OWNER",
    )
    .await;
    assert_eq!(own.status_code(), StatusCode::OK);
    assert_eq!(own.json::<serde_json::Value>()["status"], "HELD");

    let foreign = with_session(
        harness
            .server
            .get(&format!("/v1/escrows/by-booking/{booking_id}")),
        UserId::generate(),
        "OWNER",
    )
    .await;
    assert_eq!(foreign.status_code(), StatusCode::FORBIDDEN);

    let admin = with_session(
        harness
            .server
            .get(&format!("/v1/escrows/by-booking/{booking_id}")),
        UserId::generate(),
        "ADMIN",
    )
    .await;
    assert_eq!(admin.status_code(), StatusCode::OK);
}
