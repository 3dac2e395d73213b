//! Client error types.

/// Errors that can occur when using the VenuePass client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code from the response body.
        code: String,
        /// Error message from the response body.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
