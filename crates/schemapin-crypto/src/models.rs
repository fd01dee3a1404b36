//! Shared types for the crypto layer.

use thiserror::Error;

/// SHA-256 digest size in bytes.
pub const HASH_SIZE: usize = 32;

/// A 32-byte SHA-256 digest.
///
/// Used for canonical schema hashes, skill root hashes, and key
/// fingerprint material.
pub type Hash = [u8; HASH_SIZE];

/// Errors from key management and signing operations.
///
/// Signature *verification* never produces an error: any decode or
/// verification failure is reported as `false` by the verify functions.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The private key PEM could not be parsed as PKCS#8 P-256.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The public key PEM could not be parsed as SubjectPublicKeyInfo P-256.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A key could not be re-encoded to PEM or DER.
    #[error("key encoding failed: {0}")]
    KeyEncoding(String),

    /// The ECDSA signing operation failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
