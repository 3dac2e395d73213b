//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    attendance, bookings, disputes, escrows, facilities, health, payments, slots,
};
use crate::state::AppState;

/// Maximum concurrent in-flight requests for the `/v1` API surface.
/// Webhooks are excluded: their volume is controlled by the gateway.
const API_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health`
///
/// ## Facilities and slots (session headers)
/// - `PUT /v1/facilities/{id}` - sync a facility record (admin)
/// - `POST /v1/facilities/{id}/holidays` - add a holiday (owner)
/// - `DELETE /v1/facilities/{id}/holidays/{holidayId}` - remove one (owner)
/// - `POST /v1/facilities/{id}/slots/regenerate` - re-materialize (owner/admin)
/// - `POST /v1/slot-templates` - create a template (owner)
/// - `PATCH /v1/slot-templates/{id}/capacity` - update capacity (owner)
///
/// ## Bookings (session headers)
/// - `POST /v1/bookings` - create (requires `Idempotency-Key`)
/// - `GET /v1/bookings/{id}` - fetch
/// - `POST /v1/bookings/{id}/cancel` - cancel
/// - `POST /v1/bookings/{id}/payment-order` - create a gateway order
/// - `POST /v1/subscriptions/payment-order` - owner subscription order
///
/// ## Escrows and disputes (session headers)
/// - `GET /v1/escrows/by-booking/{bookingId}` - read model (owner/admin)
/// - `POST /v1/escrows/{id}/release` | `/refund` | `/block` - admin
/// - `POST /v1/disputes` - raise (user)
/// - `POST /v1/disputes/{id}/resolve` - resolve (admin)
///
/// ## Attendance (session headers)
/// - `POST /v1/attendance/scan` - credential preview (owner)
/// - `POST /v1/attendance/mark` - record a check-in (owner)
///
/// ## Webhooks (signature verification)
/// - `POST /webhooks/payments`
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);
    let state = Arc::new(state);

    let api_routes = Router::new()
        // Facilities and slots
        .route("/facilities/:id", put(facilities::upsert_facility))
        .route("/facilities/:id/holidays", post(slots::create_holiday))
        .route(
            "/facilities/:id/holidays/:holiday_id",
            delete(slots::delete_holiday),
        )
        .route(
            "/facilities/:id/slots/regenerate",
            post(slots::regenerate_facility),
        )
        .route("/slot-templates", post(slots::create_template))
        .route("/slot-templates/:id/capacity", patch(slots::update_capacity))
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route(
            "/bookings/:id/payment-order",
            post(payments::create_order_for_booking),
        )
        .route(
            "/subscriptions/payment-order",
            post(payments::create_order_for_subscription),
        )
        // Escrows
        .route("/escrows/by-booking/:booking_id", get(escrows::get_by_booking))
        .route("/escrows/:id/release", post(escrows::release))
        .route("/escrows/:id/refund", post(escrows::refund))
        .route("/escrows/:id/block", post(escrows::block))
        // Disputes
        .route("/disputes", post(disputes::create_dispute))
        .route("/disputes/:id/resolve", post(disputes::resolve_dispute))
        // Attendance
        .route("/attendance/scan", post(attendance::scan))
        .route("/attendance/mark", post(attendance::mark))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // API v1 routes
        .nest("/v1", api_routes)
        // Webhooks (signature-verified, delivered by the gateway)
        .route("/webhooks/payments", post(payments::payment_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
