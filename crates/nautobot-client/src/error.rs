//! Errors raised while building a client.
//!
//! Request failures are reported as [`TransportError`](nautobot_reconcile::TransportError).

/// Client construction errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connection settings are unusable.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

impl ClientError {
    /// Creates a new `InvalidConfig` error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
