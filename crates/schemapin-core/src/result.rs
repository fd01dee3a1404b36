//! # Structured Verification Results
//!
//! Every verification produces a [`VerificationResult`]: `valid` is
//! always present, and on failure exactly one [`ErrorCode`] is
//! populated. The engine never raises — callers branch on the result,
//! tooling serializes it, and the error codes are a stable wire
//! vocabulary shared across implementations.

use schemapin_pinning::PinStatus;
use serde::{Deserialize, Serialize};

/// Stable error codes for verification failures.
///
/// The serialized snake_case strings are part of the protocol and must
/// never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Signature decode failed or did not verify against the digest.
    SignatureInvalid,
    /// The discovery public key could not be loaded.
    KeyNotFound,
    /// The key fingerprint appears in a revocation source.
    KeyRevoked,
    /// The key fingerprint differs from the pinned one.
    KeyPinMismatch,
    /// No discovery document could be resolved for the domain.
    DiscoveryFetchFailed,
    /// The discovery document failed structural validation.
    DiscoveryInvalid,
    /// The asserted domain does not match the signature envelope.
    DomainMismatch,
    /// The artifact could not be canonicalized (I/O, invalid JSON,
    /// empty skill directory).
    SchemaCanonicalizationFailed,
}

impl ErrorCode {
    /// The stable snake_case wire string for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::SignatureInvalid => "signature_invalid",
            ErrorCode::KeyNotFound => "key_not_found",
            ErrorCode::KeyRevoked => "key_revoked",
            ErrorCode::KeyPinMismatch => "key_pin_mismatch",
            ErrorCode::DiscoveryFetchFailed => "discovery_fetch_failed",
            ErrorCode::DiscoveryInvalid => "discovery_invalid",
            ErrorCode::DomainMismatch => "domain_mismatch",
            ErrorCode::SchemaCanonicalizationFailed => "schema_canonicalization_failed",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key pinning outcome attached to a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPinning {
    /// first_use, pinned, or changed.
    pub status: PinStatus,

    /// RFC 3339 timestamp of the original pin, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<String>,
}

/// The structured outcome of a verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the artifact verified.
    pub valid: bool,

    /// Domain the verification ran against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Publisher name from the discovery document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_name: Option<String>,

    /// Pinning outcome, when a pin store participated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pinning: Option<KeyPinning>,

    /// Populated on failure; exactly one code per failed result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,

    /// Human-readable diagnostic accompanying the code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Non-fatal observations; never affect `valid`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl VerificationResult {
    /// Builds a failed result with the given code and diagnostic.
    pub fn failure(domain: Option<&str>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            domain: domain.map(str::to_string),
            developer_name: None,
            key_pinning: None,
            error_code: Some(code),
            error_message: Some(message.into()),
            warnings: Vec::new(),
        }
    }

    /// Builds a successful result for a domain.
    pub fn success(domain: &str) -> Self {
        Self {
            valid: true,
            domain: Some(domain.to_string()),
            developer_name: None,
            key_pinning: None,
            error_code: None,
            error_message: None,
            warnings: Vec::new(),
        }
    }

    /// Attaches the publisher name.
    pub fn with_developer_name(mut self, name: Option<String>) -> Self {
        self.developer_name = name;
        self
    }

    /// Attaches the pinning outcome.
    pub fn with_key_pinning(mut self, pinning: Option<KeyPinning>) -> Self {
        self.key_pinning = pinning;
        self
    }

    /// Appends a non-fatal warning.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Serializes the result to its JSON wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
