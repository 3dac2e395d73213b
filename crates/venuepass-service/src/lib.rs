//! VenuePass HTTP API service.
//!
//! This crate exposes the reservation and settlement engine over HTTP:
//!
//! - slot template management and capacity materialization
//! - idempotent, capacity-safe multi-day booking creation and cancellation
//! - payment order creation and webhook-driven reconciliation
//! - the escrow settlement state machine and its release sweep
//! - attendance scanning and marking
//! - disputes and their resolution
//!
//! Authentication lives upstream; requests carry the resolved session in
//! trusted `x-user-id` / `x-user-role` headers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Axum handlers all return Result and are async by contract.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unused_async)]

pub mod auth;
pub mod config;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweep;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use gateway::{GatewayClient, GatewayError};
pub use routes::create_router;
pub use state::AppState;
