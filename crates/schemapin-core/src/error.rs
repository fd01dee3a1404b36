//! Error types for the SchemaPin core.
//!
//! These errors circulate *below* the verification engine. The engine
//! itself never returns them: every failure is mapped to an
//! [`ErrorCode`](crate::result::ErrorCode) inside a structured
//! [`VerificationResult`](crate::result::VerificationResult).

use thiserror::Error;

/// Core error type for signing and tooling operations.
#[derive(Debug, Error)]
pub enum SchemaPinError {
    /// Key or signature operation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] schemapin_crypto::CryptoError),

    /// Discovery, revocation, or bundle handling failed.
    #[error("discovery error: {0}")]
    Discovery(#[from] schemapin_discovery::DiscoveryError),

    /// Pin store operation failed.
    #[error("pin store error: {0}")]
    Pinning(#[from] schemapin_pinning::PinError),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A skill directory could not be canonicalized.
    #[error("skill canonicalization failed: {0}")]
    SkillCanonicalization(String),

    /// The signature envelope was missing or unreadable.
    #[error("signature envelope error: {0}")]
    Envelope(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, SchemaPinError>;
