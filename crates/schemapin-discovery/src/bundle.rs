//! # Trust Bundles
//!
//! A trust bundle is an offline, multi-domain snapshot of discovery and
//! revocation documents, used where the well-known endpoint cannot be
//! reached (air-gapped verification, CI, vendored trust sets).
//!
//! The wire format flattens each discovery entry: the `domain` key sits
//! at the same level as the discovery fields, not nested under them.
//! That exact shape is what `#[serde(flatten)]` produces here and what
//! every other implementation must accept.

use crate::discovery::DiscoveryDocument;
use crate::error::Result;
use crate::revocation::RevocationDocument;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Bundle format version written by [`TrustBundle::new`].
const BUNDLE_VERSION: &str = "1.0";

/// A discovery document flattened together with its domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundledDiscovery {
    /// Domain the discovery applies to.
    pub domain: String,

    /// The discovery fields, merged at the same JSON level as `domain`.
    #[serde(flatten)]
    pub discovery: DiscoveryDocument,
}

/// An offline bundle of discovery and revocation documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustBundle {
    /// Bundle format version.
    pub schemapin_bundle_version: String,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// Flattened discovery entries.
    #[serde(default)]
    pub documents: Vec<BundledDiscovery>,

    /// Standalone revocation documents.
    #[serde(default)]
    pub revocations: Vec<RevocationDocument>,
}

impl TrustBundle {
    /// Creates an empty bundle timestamped now.
    pub fn new() -> Self {
        Self {
            schemapin_bundle_version: BUNDLE_VERSION.to_string(),
            created_at: Utc::now().to_rfc3339(),
            documents: Vec::new(),
            revocations: Vec::new(),
        }
    }

    /// Adds a discovery document for a domain in the flattened shape.
    pub fn add_document(&mut self, domain: &str, discovery: DiscoveryDocument) {
        self.documents.push(BundledDiscovery {
            domain: domain.to_string(),
            discovery,
        });
    }

    /// Adds a standalone revocation document.
    pub fn add_revocation(&mut self, revocation: RevocationDocument) {
        self.revocations.push(revocation);
    }

    /// Finds the discovery document for a domain.
    pub fn find_discovery(&self, domain: &str) -> Option<&DiscoveryDocument> {
        self.documents
            .iter()
            .find(|entry| entry.domain == domain)
            .map(|entry| &entry.discovery)
    }

    /// Finds the revocation document for a domain.
    pub fn find_revocation(&self, domain: &str) -> Option<&RevocationDocument> {
        self.revocations.iter().find(|rev| rev.domain == domain)
    }

    /// Parses a bundle from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the bundle to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for TrustBundle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revocation::RevocationReason;

    const FAKE_PEM: &str = "-----BEGIN PUBLIC KEY-----\nMFkw\n-----END PUBLIC KEY-----\n";

    fn sample_bundle() -> TrustBundle {
        let mut bundle = TrustBundle::new();
        let mut discovery = DiscoveryDocument::new("1.2", FAKE_PEM);
        discovery.developer_name = Some("Example Corp".to_string());
        bundle.add_document("example.com", discovery);

        let mut revocation = RevocationDocument::new("example.com");
        revocation.add_revoked_key("sha256:old", RevocationReason::Superseded);
        bundle.add_revocation(revocation);

        bundle
    }

    #[test]
    fn test_lookup() {
        let bundle = sample_bundle();

        let discovery = bundle.find_discovery("example.com").unwrap();
        assert_eq!(discovery.developer_name.as_deref(), Some("Example Corp"));
        assert!(bundle.find_discovery("other.com").is_none());

        let revocation = bundle.find_revocation("example.com").unwrap();
        assert_eq!(revocation.revoked_keys.len(), 1);
        assert!(bundle.find_revocation("other.com").is_none());
    }

    #[test]
    fn test_flattened_wire_shape() {
        let bundle = sample_bundle();
        let json = bundle.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        // domain sits beside the discovery fields, not above them.
        let entry = &value["documents"][0];
        assert_eq!(entry["domain"], "example.com");
        assert_eq!(entry["schema_version"], "1.2");
        assert_eq!(entry["developer_name"], "Example Corp");
        assert!(entry.get("discovery").is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let bundle = sample_bundle();
        let json = bundle.to_json().unwrap();
        let parsed = TrustBundle::from_json(&json).unwrap();
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn test_accepts_external_flattened_bundle() {
        // Hand-written bundle in the documented external shape.
        let json = r#"{
            "schemapin_bundle_version": "1.0",
            "created_at": "2025-06-01T00:00:00Z",
            "documents": [
                {
                    "domain": "example.com",
                    "schema_version": "1.2",
                    "public_key_pem": "-----BEGIN PUBLIC KEY-----\nMFkw\n-----END PUBLIC KEY-----\n"
                }
            ]
        }"#;

        let bundle = TrustBundle::from_json(json).unwrap();
        let discovery = bundle.find_discovery("example.com").unwrap();
        assert!(discovery.is_valid());
        assert!(bundle.revocations.is_empty());
    }
}
