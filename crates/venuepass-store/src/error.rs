//! Error types for the storage layer.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A record that must exist is missing.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("{entity} already exists")]
    AlreadyExists {
        /// The entity kind whose key collided.
        entity: &'static str,
    },
}
