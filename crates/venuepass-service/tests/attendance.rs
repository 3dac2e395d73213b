//! Attendance scanning and marking.

mod common;

use axum::http::StatusCode;
use chrono::Duration;

use venuepass_core::{BookingStatus, UserId};

use common::{booking_id_of, today, with_session, TestHarness};

async fn scan(harness: &TestHarness, owner: UserId, qr_code: &str) -> axum_test::TestResponse {
    with_session(harness.server.post("/v1/attendance/scan"), owner, "OWNER")
        .json(&serde_json::json!({ "qrCode": qr_code }))
        .await
}

async fn mark(
    harness: &TestHarness,
    owner: UserId,
    booking_id: venuepass_core::BookingId,
) -> axum_test::TestResponse {
    with_session(harness.server.post("/v1/attendance/mark"), owner, "OWNER")
        .json(&serde_json::json!({ "bookingId": booking_id }))
        .await
}

#[tokio::test]
async fn scan_previews_without_marking() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let body = harness
        .book_ok(UserId::generate(), facility, 3, today(), "scan-1")
        .await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 255).await;

    let response = scan(&harness, owner, body["qrCode"].as_str().unwrap()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let preview = response.json::<serde_json::Value>();
    assert_eq!(preview["canMarkAttendance"], true);
    assert_eq!(preview["reason"], serde_json::Value::Null);
    assert_eq!(preview["activeDaysRemaining"], 3);
    assert_eq!(preview["facilityName"], "Test Court");

    // Preview only: nothing was consumed.
    assert!(!harness.state.store.attendance_exists(booking_id, today()).unwrap());
    let booking = harness.state.store.get_booking(booking_id).unwrap().unwrap();
    assert_eq!(booking.active_days_remaining, 3);
}

#[tokio::test]
async fn scan_rejects_tampered_credentials() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let body = harness
        .book_ok(UserId::generate(), facility, 1, today(), "scan-tamper")
        .await;
    let mut qr_code = body["qrCode"].as_str().unwrap().to_string();
    // Flip a character inside the signature segment.
    let flipped = if qr_code.ends_with('0') { '1' } else { '0' };
    qr_code.pop();
    qr_code.push(flipped);

    let response = scan(&harness, owner, &qr_code).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scan_is_owner_scoped() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let body = harness
        .book_ok(UserId::generate(), facility, 1, today(), "scan-owner")
        .await;

    let response = scan(&harness, UserId::generate(), body["qrCode"].as_str().unwrap()).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn scan_outside_validity_window_is_rejected() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let body = harness
        .book_ok(
            UserId::generate(),
            facility,
            1,
            today() + Duration::days(3),
            "scan-early",
        )
        .await;

    let response = scan(&harness, owner, body["qrCode"].as_str().unwrap()).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn marking_consumes_days_and_completes_the_pass() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    // A 1-day pass starting today: the first mark completes it.
    let body = harness
        .book_ok(UserId::generate(), facility, 1, today(), "mark-complete")
        .await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 102).await;

    let response = mark(&harness, owner, booking_id).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let result = response.json::<serde_json::Value>();
    assert_eq!(result["activeDaysRemaining"], 0);
    assert_eq!(result["bookingStatus"], "COMPLETED");

    let booking = harness.state.store.get_booking(booking_id).unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Completed);
    assert!(harness.state.store.attendance_exists(booking_id, today()).unwrap());

    // A completed pass takes no further marks.
    let again = mark(&harness, owner, booking_id).await;
    assert_eq!(again.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn marking_twice_on_one_day_is_rejected() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let body = harness
        .book_ok(UserId::generate(), facility, 3, today(), "mark-twice")
        .await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 255).await;

    let first = mark(&harness, owner, booking_id).await;
    assert_eq!(first.status_code(), StatusCode::OK);
    assert_eq!(
        first.json::<serde_json::Value>()["activeDaysRemaining"],
        2
    );
    let booking = harness.state.store.get_booking(booking_id).unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Active);

    let second = mark(&harness, owner, booking_id).await;
    assert_eq!(second.status_code(), StatusCode::BAD_REQUEST);

    let booking = harness.state.store.get_booking(booking_id).unwrap().unwrap();
    assert_eq!(booking.active_days_remaining, 2);
}

#[tokio::test]
async fn marking_on_a_holiday_is_rejected() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let body = harness
        .book_ok(UserId::generate(), facility, 1, today(), "mark-holiday")
        .await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 102).await;

    // The facility closes today after the booking was made.
    let response = with_session(
        harness
            .server
            .post(&format!("/v1/facilities/{facility}/holidays")),
        owner,
        "OWNER",
    )
    .json(&serde_json::json!({
        "startDate": today(),
        "endDate": today(),
        "reason": "flooding",
    }))
    .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = mark(&harness, owner, booking_id).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn marking_is_owner_scoped() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    let facility = harness.seed_facility(owner).await;
    harness.seed_template(owner, facility, 5).await;

    let body = harness
        .book_ok(UserId::generate(), facility, 1, today(), "mark-foreign")
        .await;
    let booking_id = booking_id_of(&body);
    harness.activate_booking(booking_id, 102).await;

    let response = mark(&harness, UserId::generate(), booking_id).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}
