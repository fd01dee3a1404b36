//! # Standalone Revocation Documents
//!
//! A publisher can revoke keys two ways: the simple `revoked_keys` list
//! inside the discovery document, or a standalone revocation document
//! served from the discovery's `revocation_endpoint`. Verification
//! checks both sources; a fingerprint listed in either is a hard
//! `key_revoked` failure.
//!
//! Revocation freshness is best-effort by design: documents are static
//! JSON, cacheable, and fetched with the same bounded-timeout rules as
//! discovery itself.

use crate::error::{DiscoveryError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Document version written by the authoring helpers.
const REVOCATION_DOC_VERSION: &str = "1.2";

/// Why a key was revoked.
///
/// A closed set; unknown strings are rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// The private key is known or suspected to be compromised.
    KeyCompromise,
    /// The key was replaced by a newer one.
    Superseded,
    /// The publisher stopped operating.
    CessationOfOperation,
    /// The publisher's signing privilege was withdrawn.
    PrivilegeWithdrawn,
}

impl RevocationReason {
    /// The stable snake_case wire string for this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationReason::KeyCompromise => "key_compromise",
            RevocationReason::Superseded => "superseded",
            RevocationReason::CessationOfOperation => "cessation_of_operation",
            RevocationReason::PrivilegeWithdrawn => "privilege_withdrawn",
        }
    }
}

impl std::fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single revoked-key entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedKey {
    /// Canonical `sha256:<hex>` fingerprint of the revoked key.
    pub fingerprint: String,

    /// RFC 3339 timestamp of the revocation.
    pub revoked_at: String,

    /// Why the key was revoked.
    pub reason: RevocationReason,
}

/// A standalone revocation document for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationDocument {
    /// Protocol version of the document.
    pub schemapin_version: String,

    /// Domain the revocations apply to.
    pub domain: String,

    /// RFC 3339 timestamp of the last modification.
    pub updated_at: String,

    /// The revoked keys.
    #[serde(default)]
    pub revoked_keys: Vec<RevokedKey>,
}

impl RevocationDocument {
    /// Creates an empty revocation document for a domain, timestamped now.
    pub fn new(domain: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            schemapin_version: REVOCATION_DOC_VERSION.to_string(),
            domain: domain.to_string(),
            updated_at: now,
            revoked_keys: Vec::new(),
        }
    }

    /// Appends a revoked key and refreshes `updated_at`.
    pub fn add_revoked_key(&mut self, fingerprint: &str, reason: RevocationReason) {
        let now = Utc::now().to_rfc3339();
        self.revoked_keys.push(RevokedKey {
            fingerprint: fingerprint.to_string(),
            revoked_at: now.clone(),
            reason,
        });
        self.updated_at = now;
    }

    /// Looks up the entry for a fingerprint, if revoked here.
    pub fn find(&self, fingerprint: &str) -> Option<&RevokedKey> {
        self.revoked_keys.iter().find(|k| k.fingerprint == fingerprint)
    }
}

/// Fails if the fingerprint appears in the standalone document.
///
/// # Errors
///
/// Returns [`DiscoveryError::KeyRevoked`] carrying the documented reason.
pub fn check_revocation(doc: &RevocationDocument, fingerprint: &str) -> Result<()> {
    match doc.find(fingerprint) {
        Some(entry) => Err(DiscoveryError::KeyRevoked {
            fingerprint: fingerprint.to_string(),
            reason: entry.reason.as_str().to_string(),
        }),
        None => Ok(()),
    }
}

/// Fails if the fingerprint appears in either revocation source.
///
/// Both sources are optional; two `None`s is a success. The simple list
/// comes from the discovery document's `revoked_keys`, the standalone
/// document from its `revocation_endpoint`.
pub fn check_revocation_combined(
    simple_revoked: Option<&[String]>,
    doc: Option<&RevocationDocument>,
    fingerprint: &str,
) -> Result<()> {
    if let Some(list) = simple_revoked {
        if list.iter().any(|fp| fp == fingerprint) {
            return Err(DiscoveryError::KeyRevoked {
                fingerprint: fingerprint.to_string(),
                reason: "listed in discovery revoked_keys".to_string(),
            });
        }
    }

    if let Some(doc) = doc {
        check_revocation(doc, fingerprint)?;
    }

    Ok(())
}

/// Fetches a standalone revocation document from a URL.
///
/// Any transport, status, or parse failure collapses to `None`;
/// revocation distribution is best-effort.
pub fn fetch_revocation_document(url: &str, timeout: Duration) -> Option<RevocationDocument> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .ok()?;

    match client.get(url).send().and_then(|r| r.error_for_status()) {
        Ok(response) => match response.json::<RevocationDocument>() {
            Ok(doc) => Some(doc),
            Err(e) => {
                debug!("revocation document at {} failed to parse: {}", url, e);
                None
            }
        },
        Err(e) => {
            debug!("revocation fetch from {} failed: {}", url, e);
            None
        }
    }
}
