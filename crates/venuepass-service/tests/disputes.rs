//! Dispute lifecycle and its effect on bookings, escrows, and trust.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use venuepass_core::{
    AccountStatus, BookingStatus, EscrowStatus, UserId, UserTrust,
};

use common::{booking_id_of, today, with_session, TestHarness};

async fn raise_dispute(
    harness: &TestHarness,
    user: UserId,
    booking_id: venuepass_core::BookingId,
) -> axum_test::TestResponse {
    with_session(harness.server.post("/v1/disputes"), user, "USER")
        .json(&serde_json::json!({
            "bookingId": booking_id,
            "reason": "facility was unusable",
        }))
        .await
}

async fn resolve(
    harness: &TestHarness,
    dispute_id: &str,
    decision: &str,
) -> axum_test::TestResponse {
    with_session(
        harness
            .server
            .post(&format!("/v1/disputes/{dispute_id}/resolve")),
        UserId::generate(),
        "ADMIN",
    )
    .json(&serde_json::json!({
        "decision": decision,
        "note": "reviewed evidence",
    }))
    .await
}

#[tokio::test]
async fn dispute_freezes_booking_and_pauses_escrow() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let user = UserId::generate();
    let body = harness.book_ok(user, facility, 1, today(), "dispute-1").await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 102).await;

    let response = raise_dispute(&harness, user, booking_id).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<serde_json::Value>()["status"], "SUBMITTED");

    let booking = harness.state.store.get_booking(booking_id).unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Disputed);
    let escrow = harness
        .state
        .store
        .get_escrow_by_booking(booking_id)
        .unwrap()
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Paused);
}

#[tokio::test]
async fn only_one_dispute_may_be_open() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let user = UserId::generate();
    let body = harness.book_ok(user, facility, 1, today(), "dispute-dup").await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 102).await;

    assert_eq!(
        raise_dispute(&harness, user, booking_id).await.status_code(),
        StatusCode::OK
    );
    // The booking is now DISPUTED, so a second dispute fails the status
    // guard before the uniqueness check.
    assert_eq!(
        raise_dispute(&harness, user, booking_id).await.status_code(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn dispute_is_user_scoped_and_blocked_by_attendance() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let user = UserId::generate();
    let body = harness.book_ok(user, facility, 3, today(), "dispute-guards").await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 255).await;

    let foreign = raise_dispute(&harness, UserId::generate(), booking_id).await;
    assert_eq!(foreign.status_code(), StatusCode::FORBIDDEN);

    // Once checked in, the service has proof of use; no dispute.
    let marked = with_session(harness.server.post("/v1/attendance/mark"), owner, "OWNER")
        .json(&serde_json::json!({ "bookingId": booking_id }))
        .await;
    assert_eq!(marked.status_code(), StatusCode::OK);

    let after_attendance = raise_dispute(&harness, user, booking_id).await;
    assert_eq!(after_attendance.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reject_restores_active_within_window_and_debits_trust() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let user = UserId::generate();
    // A 3-day pass starting today is still inside its window at resolve
    // time.
    let body = harness.book_ok(user, facility, 3, today(), "reject-active").await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 255).await;

    let dispute = raise_dispute(&harness, user, booking_id).await;
    let dispute_id = dispute.json::<serde_json::Value>()["disputeId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = resolve(&harness, &dispute_id, "REJECT").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<serde_json::Value>()["status"],
        "RESOLVED_REJECTED"
    );

    let booking = harness.state.store.get_booking(booking_id).unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Active);
    let escrow = harness
        .state
        .store
        .get_escrow_by_booking(booking_id)
        .unwrap()
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Held);

    let trust = harness.state.store.get_trust(user).unwrap();
    assert_eq!(trust.trust_score, -10);
    assert_eq!(trust.rejected_disputes, 1);
    assert_eq!(trust.account_status, AccountStatus::Active);

    // Resolution is terminal.
    let again = resolve(&harness, &dispute_id, "REJECT").await;
    assert_eq!(again.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn reject_after_the_pass_window_completes_the_booking() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let user = UserId::generate();
    // The pass ended days ago; rejecting the dispute must not resurrect
    // an ACTIVE booking.
    let body = harness
        .book_ok(user, facility, 1, today() - Duration::days(5), "reject-past")
        .await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 102).await;

    let dispute = raise_dispute(&harness, user, booking_id).await;
    assert_eq!(dispute.status_code(), StatusCode::OK);
    let dispute_id = dispute.json::<serde_json::Value>()["disputeId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = resolve(&harness, &dispute_id, "REJECT").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let booking = harness.state.store.get_booking(booking_id).unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Completed);
}

#[tokio::test]
async fn refund_resolution_cancels_booking_and_refunds_escrow() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1/payments/.+/refund$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "rfnd_dispute",
            "status": "processed",
        })))
        .mount(&gateway)
        .await;

    let harness = TestHarness::with_gateway(&gateway.uri());
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let user = UserId::generate();
    let body = harness.book_ok(user, facility, 1, today(), "refund-res").await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 102).await;

    let dispute = raise_dispute(&harness, user, booking_id).await;
    let dispute_id = dispute.json::<serde_json::Value>()["disputeId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = resolve(&harness, &dispute_id, "REFUND").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<serde_json::Value>()["status"],
        "RESOLVED_REFUND"
    );

    let booking = harness.state.store.get_booking(booking_id).unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    let escrow = harness
        .state
        .store
        .get_escrow_by_booking(booking_id)
        .unwrap()
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Refunded);

    let dispute = harness
        .state
        .store
        .get_dispute(dispute_id.parse().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(dispute.refund_amount, Some(102));

    let trust = harness.state.store.get_trust(user).unwrap();
    assert_eq!(trust.trust_score, 5);
}

#[tokio::test]
async fn third_rejection_flags_the_account() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let user = UserId::generate();

    // Two earlier disputes were already rejected elsewhere.
    let mut trust = UserTrust::new(user);
    trust.trust_score = -20;
    trust.rejected_disputes = 2;
    let mut batch = harness.state.store.batch();
    batch.put_trust(&trust).unwrap();
    batch.commit().unwrap();

    let body = harness.book_ok(user, facility, 1, today(), "third-strike").await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 102).await;

    let dispute = raise_dispute(&harness, user, booking_id).await;
    let dispute_id = dispute.json::<serde_json::Value>()["disputeId"]
        .as_str()
        .unwrap()
        .to_string();
    let response = resolve(&harness, &dispute_id, "REJECT").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let trust = harness.state.store.get_trust(user).unwrap();
    assert_eq!(trust.rejected_disputes, 3);
    assert_eq!(trust.account_status, AccountStatus::UnderMonitoring);
}
