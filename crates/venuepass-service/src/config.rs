//! Service configuration.

use serde::Deserialize;
use std::path::Path;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/venuepass").
    pub data_dir: String,

    /// Payment gateway API base URL (optional; payments disabled without it).
    pub gateway_base_url: Option<String>,

    /// Payment gateway key id (optional).
    pub gateway_key_id: Option<String>,

    /// Payment gateway key secret (optional).
    pub gateway_key_secret: Option<String>,

    /// Webhook signing secret shared with the gateway (optional).
    pub webhook_secret: Option<String>,

    /// HMAC secret for pass credentials.
    pub credential_secret: String,

    /// Currency for all orders (default: "INR").
    pub currency: String,

    /// How long cached idempotency responses stay valid, in seconds.
    pub idempotency_ttl_seconds: i64,

    /// Escrow release sweep interval, in seconds.
    pub escrow_sweep_interval_seconds: u64,

    /// Slot refresh sweep interval, in seconds.
    pub slot_refresh_interval_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Gateway secrets file structure.
#[derive(Debug, Deserialize)]
struct GatewaySecrets {
    key_id: String,
    key_secret: String,
    #[serde(default)]
    webhook_secret: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and the optional
    /// gateway secrets file.
    #[must_use]
    pub fn from_env() -> Self {
        let (gateway_base_url, gateway_key_id, gateway_key_secret, webhook_secret) =
            load_gateway_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/venuepass".into()),
            gateway_base_url,
            gateway_key_id,
            gateway_key_secret,
            webhook_secret,
            credential_secret: std::env::var("PASS_CREDENTIAL_SECRET")
                .unwrap_or_else(|_| "insecure-dev-credential-secret".into()),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "INR".into()),
            idempotency_ttl_seconds: std::env::var("IDEMPOTENCY_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600),
            escrow_sweep_interval_seconds: std::env::var("ESCROW_SWEEP_INTERVAL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            slot_refresh_interval_seconds: std::env::var("SLOT_REFRESH_INTERVAL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(7200),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

/// Load gateway secrets from file or environment.
fn load_gateway_secrets() -> (Option<String>, Option<String>, Option<String>, Option<String>) {
    let secret_paths = [".secrets/gateway.json", "../.secrets/gateway.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<GatewaySecrets>(path) {
            tracing::info!(path = %path, "Loaded gateway secrets from file");
            return (
                secrets
                    .base_url
                    .or_else(|| std::env::var("GATEWAY_BASE_URL").ok()),
                Some(secrets.key_id),
                Some(secrets.key_secret),
                secrets
                    .webhook_secret
                    .or_else(|| std::env::var("GATEWAY_WEBHOOK_SECRET").ok()),
            );
        }
    }

    tracing::debug!("Gateway secrets file not found, using environment variables");
    (
        std::env::var("GATEWAY_BASE_URL").ok(),
        std::env::var("GATEWAY_KEY_ID").ok(),
        std::env::var("GATEWAY_KEY_SECRET").ok(),
        std::env::var("GATEWAY_WEBHOOK_SECRET").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/venuepass".into(),
            gateway_base_url: None,
            gateway_key_id: None,
            gateway_key_secret: None,
            webhook_secret: None,
            credential_secret: "insecure-dev-credential-secret".into(),
            currency: "INR".into(),
            idempotency_ttl_seconds: 600,
            escrow_sweep_interval_seconds: 3600,
            slot_refresh_interval_seconds: 7200,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
