//! Payment gateway integration.
//!
//! The gateway is an external collaborator reached over HTTP: order creation
//! before checkout, refunds on cancellation/dispute, and signed webhooks
//! driving reconciliation (handled in `handlers::payments`).

mod client;
mod types;

pub use client::{GatewayClient, GatewayError};
pub use types::{Order, Refund};
