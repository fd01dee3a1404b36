//! Error types for discovery and revocation handling.

use thiserror::Error;

/// Errors from discovery, revocation, and bundle operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// A document could not be parsed or serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key fingerprint appears in a revocation source.
    #[error("key {fingerprint} is revoked: {reason}")]
    KeyRevoked {
        /// The revoked fingerprint.
        fingerprint: String,
        /// Why the key was revoked, or which source listed it.
        reason: String,
    },
}

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
