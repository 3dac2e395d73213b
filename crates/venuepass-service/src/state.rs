//! Application state.

use std::sync::Arc;

use venuepass_store::{RowLocks, Store};

use crate::config::ServiceConfig;
use crate::gateway::GatewayClient;

/// Application state shared across handlers and sweeps.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<Store>,

    /// The row-lock table serializing conflicting units of work.
    pub locks: RowLocks,

    /// Payment gateway client (optional).
    pub gateway: Option<Arc<GatewayClient>>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<Store>, config: ServiceConfig) -> Self {
        let gateway = match (
            config.gateway_base_url.as_ref(),
            config.gateway_key_id.as_ref(),
            config.gateway_key_secret.as_ref(),
        ) {
            (Some(url), Some(key_id), Some(secret)) => {
                match GatewayClient::new(url, key_id, secret) {
                    Ok(client) => {
                        tracing::info!(gateway_url = %url, "Payment gateway enabled");
                        Some(Arc::new(client))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to create gateway client");
                        None
                    }
                }
            }
            _ => None,
        };

        if gateway.is_none() {
            tracing::warn!("Payment gateway not configured - orders and refunds unavailable");
        }

        Self {
            store,
            locks: RowLocks::new(),
            gateway,
            config,
        }
    }

    /// Check if the payment gateway is configured.
    #[must_use]
    pub fn has_gateway(&self) -> bool {
        self.gateway.is_some()
    }
}
