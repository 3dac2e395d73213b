//! VenuePass service entry point.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use venuepass_service::{create_router, sweep, AppState, ServiceConfig};
use venuepass_store::Store;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,venuepass=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting VenuePass service");

    let config = ServiceConfig::from_env();
    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        gateway_configured = %config.gateway_base_url.is_some(),
        "Service configuration loaded"
    );

    tracing::info!(path = %config.data_dir, "Opening store");
    let store = Arc::new(Store::open(&config.data_dir)?);

    let state = AppState::new(store, config.clone());

    sweep::spawn(Arc::new(state.clone()));

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(listen_addr = %config.listen_addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
