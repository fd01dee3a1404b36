//! # Pin Store Contract and Records
//!
//! Trust-On-First-Use pinning associates `(tool_id, domain)` with the key
//! fingerprint observed on first successful verification. The contract is
//! deliberately tiny — observe-and-pin, then read back — and the three
//! possible outcomes form a closed set so callers must handle the
//! `changed` case explicitly.
//!
//! ## Threat Model
//!
//! Pinning defends against key substitution *after* first contact: a
//! publisher's endpoint serving a new key (compromise, hijack, or silent
//! rotation) surfaces as [`PinStatus::Changed`], which the verification
//! engine always treats as a hard failure. Pinning cannot protect the
//! first contact itself; that is the TOFU trade-off.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a pin check for `(tool_id, domain)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinStatus {
    /// No pin existed; the fingerprint has now been pinned.
    FirstUse,

    /// The fingerprint matches the existing pin.
    Pinned,

    /// The fingerprint differs from the existing pin.
    ///
    /// The store does not mutate on this outcome; the caller decides the
    /// response. The verification engine fails hard.
    Changed,
}

impl PinStatus {
    /// The stable snake_case wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PinStatus::FirstUse => "first_use",
            PinStatus::Pinned => "pinned",
            PinStatus::Changed => "changed",
        }
    }
}

impl std::fmt::Display for PinStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durable pin record, also the export/import element shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedKey {
    /// Opaque application identifier for the pinned tool.
    pub tool_id: String,

    /// The pinned public key PEM, when known.
    ///
    /// Pins created through the minimum `check_and_pin` contract carry
    /// only a fingerprint; pins created via `pin_key` or import carry
    /// the full PEM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_pem: Option<String>,

    /// Domain the pin was established against.
    pub domain: String,

    /// Publisher name recorded at pin time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_name: Option<String>,

    /// RFC 3339 timestamp of the first observation.
    pub pinned_at: String,

    /// RFC 3339 timestamp of the most recent successful verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verified: Option<String>,
}

/// Errors from pin store operations.
#[derive(Debug, Error)]
pub enum PinError {
    /// The underlying database failed.
    #[error("pin database error: {0}")]
    Database(#[from] sled::Error),

    /// A stored record could not be encoded or decoded.
    #[error("pin serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value had an unexpected shape.
    #[error("corrupt pin record: {0}")]
    Corrupt(String),

    /// A public key PEM could not be parsed while pinning or importing.
    #[error("invalid pinned key: {0}")]
    InvalidKey(String),
}

/// Result type for pin store operations.
pub type Result<T> = std::result::Result<T, PinError>;

/// The minimum Trust-On-First-Use contract.
///
/// For a given `(tool_id, domain)` the store serializes observations:
/// two concurrent [`check_and_pin`](PinStore::check_and_pin) calls with
/// different fingerprints must never both return
/// [`PinStatus::FirstUse`].
pub trait PinStore: Send + Sync {
    /// Checks a fingerprint against the pin for `(tool_id, domain)`,
    /// pinning it on first use.
    fn check_and_pin(&self, tool_id: &str, domain: &str, fingerprint: &str) -> Result<PinStatus>;

    /// Returns the pinned fingerprint for `(tool_id, domain)`, if any.
    fn get_pinned(&self, tool_id: &str, domain: &str) -> Result<Option<String>>;
}
