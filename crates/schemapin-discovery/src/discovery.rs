//! # Discovery Documents
//!
//! A discovery document describes a publisher's signing key and policy.
//! It is served read-only at `https://<domain>/.well-known/schemapin.json`
//! and consumed by verifiers either online (see the resolver module) or
//! offline through trust bundles.
//!
//! Required fields are `schema_version` and `public_key_pem`; everything
//! else is optional metadata or revocation policy. A document is valid
//! iff its `public_key_pem` carries the `BEGIN PUBLIC KEY` block marker —
//! deeper key validation belongs to the verification engine.

use serde::{Deserialize, Serialize};

/// Path component of the well-known discovery URL.
pub const WELL_KNOWN_PATH: &str = "/.well-known/schemapin.json";

/// PEM block marker a valid discovery key must contain.
pub const PUBLIC_KEY_MARKER: &str = "-----BEGIN PUBLIC KEY-----";

/// A publisher's discovery document (schema version 1.2+).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    /// Document schema version, e.g. `"1.2"` or `"1.3"`.
    #[serde(default)]
    pub schema_version: String,

    /// SubjectPublicKeyInfo PEM of the publisher's signing key.
    #[serde(default)]
    pub public_key_pem: String,

    /// Human-readable publisher name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_name: Option<String>,

    /// Publisher contact address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    /// Simple revocation list of `sha256:<hex>` fingerprints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_keys: Option<Vec<String>>,

    /// URL of a standalone revocation document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_endpoint: Option<String>,
}

impl DiscoveryDocument {
    /// Creates a minimal document with the two required fields.
    pub fn new(schema_version: impl Into<String>, public_key_pem: impl Into<String>) -> Self {
        Self {
            schema_version: schema_version.into(),
            public_key_pem: public_key_pem.into(),
            developer_name: None,
            contact: None,
            revoked_keys: None,
            revocation_endpoint: None,
        }
    }

    /// Checks the structural validity rule: both required fields present
    /// and the PEM carrying the public-key block marker.
    pub fn is_valid(&self) -> bool {
        !self.schema_version.is_empty() && self.public_key_pem.contains(PUBLIC_KEY_MARKER)
    }

    /// Constructs the well-known discovery URL for a domain.
    ///
    /// Bare domains get an `https://` prefix; explicit `http://` or
    /// `https://` origins are kept as given.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schemapin_discovery::DiscoveryDocument;
    ///
    /// assert_eq!(
    ///     DiscoveryDocument::well_known_url("example.com"),
    ///     "https://example.com/.well-known/schemapin.json"
    /// );
    /// ```
    pub fn well_known_url(domain: &str) -> String {
        if domain.starts_with("https://") || domain.starts_with("http://") {
            format!("{}{}", domain.trim_end_matches('/'), WELL_KNOWN_PATH)
        } else {
            format!("https://{}{}", domain, WELL_KNOWN_PATH)
        }
    }
}

/// Builds a ready-to-serve discovery document for a publisher.
///
/// This is the authoring-side counterpart of the well-known endpoint:
/// the returned document serializes to exactly the response body a
/// domain should host.
pub fn create_well_known_response(
    public_key_pem: &str,
    developer_name: Option<&str>,
    contact: Option<&str>,
    revoked_keys: Option<Vec<String>>,
    schema_version: &str,
) -> DiscoveryDocument {
    DiscoveryDocument {
        schema_version: schema_version.to_string(),
        public_key_pem: public_key_pem.to_string(),
        developer_name: developer_name.map(str::to_string),
        contact: contact.map(str::to_string),
        revoked_keys,
        revocation_endpoint: None,
    }
}
