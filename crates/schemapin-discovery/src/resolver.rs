//! # Discovery Resolvers
//!
//! A [`Resolver`] is a pure data source: it locates discovery and
//! revocation documents for a domain and performs no verification of
//! its own. Every failure mode — network error, missing file, malformed
//! JSON, timeout — collapses to `None`; the verification engine turns a
//! missing discovery into `discovery_fetch_failed`.
//!
//! Four implementations cover the deployment spectrum:
//!
//! | Resolver | Source | Typical use |
//! |----------|--------|-------------|
//! | [`WellKnownResolver`] | `https://<domain>/.well-known/schemapin.json` | Online verification |
//! | [`LocalFileResolver`] | `<dir>/<domain>.json` | Mirrored or vendored documents |
//! | [`TrustBundleResolver`] | In-memory [`TrustBundle`] | Air-gapped verification |
//! | [`ChainResolver`] | Ordered list of the above | Online with offline fallback |
//!
//! Discovery and revocation resolve independently in a chain: the
//! discovery may come from one constituent and the revocation from
//! another.

use crate::bundle::TrustBundle;
use crate::discovery::DiscoveryDocument;
use crate::error::{DiscoveryError, Result};
use crate::revocation::{fetch_revocation_document, RevocationDocument};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Default network timeout for well-known and revocation fetches.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A pluggable source of discovery and revocation documents.
pub trait Resolver: Send + Sync {
    /// Resolves the discovery document for a domain, or `None`.
    fn resolve_discovery(&self, domain: &str) -> Option<DiscoveryDocument>;

    /// Resolves the revocation document for a domain, or `None`.
    ///
    /// The already-resolved discovery is passed in because some sources
    /// (the well-known resolver) read the revocation location from it.
    fn resolve_revocation(
        &self,
        domain: &str,
        discovery: &DiscoveryDocument,
    ) -> Option<RevocationDocument>;
}

/// Resolves documents from the standard well-known HTTPS endpoint.
pub struct WellKnownResolver {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl WellKnownResolver {
    /// Creates a resolver with the default 10 second timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a resolver with a caller-chosen timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::HttpClient`] if the TLS-backed client
    /// cannot be constructed.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::HttpClient(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    /// Fetches and shape-validates the well-known document for a domain.
    pub fn fetch_well_known(&self, domain: &str) -> Option<DiscoveryDocument> {
        let url = DiscoveryDocument::well_known_url(domain);

        let response = match self.client.get(&url).send().and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(e) => {
                debug!("well-known fetch from {} failed: {}", url, e);
                return None;
            }
        };

        match response.json::<DiscoveryDocument>() {
            Ok(doc) if doc.is_valid() => Some(doc),
            Ok(_) => {
                debug!("well-known document from {} failed validation", url);
                None
            }
            Err(e) => {
                debug!("well-known document from {} failed to parse: {}", url, e);
                None
            }
        }
    }
}

impl Resolver for WellKnownResolver {
    fn resolve_discovery(&self, domain: &str) -> Option<DiscoveryDocument> {
        self.fetch_well_known(domain)
    }

    fn resolve_revocation(
        &self,
        _domain: &str,
        discovery: &DiscoveryDocument,
    ) -> Option<RevocationDocument> {
        let endpoint = discovery.revocation_endpoint.as_deref()?;
        fetch_revocation_document(endpoint, self.timeout)
    }
}

/// Resolves documents from local JSON files.
///
/// Discovery lives at `<discovery_dir>/<domain>.json`, revocations at
/// `<revocation_dir>/<domain>.revocations.json`.
pub struct LocalFileResolver {
    discovery_dir: PathBuf,
    revocation_dir: Option<PathBuf>,
}

impl LocalFileResolver {
    /// Creates a resolver over a discovery directory and an optional
    /// revocation directory.
    pub fn new(discovery_dir: impl Into<PathBuf>, revocation_dir: Option<PathBuf>) -> Self {
        Self {
            discovery_dir: discovery_dir.into(),
            revocation_dir,
        }
    }
}

impl Resolver for LocalFileResolver {
    fn resolve_discovery(&self, domain: &str) -> Option<DiscoveryDocument> {
        let path = self.discovery_dir.join(format!("{}.json", domain));
        let text = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<DiscoveryDocument>(&text) {
            Ok(doc) => Some(doc),
            Err(e) => {
                debug!("discovery file {} failed to parse: {}", path.display(), e);
                None
            }
        }
    }

    fn resolve_revocation(
        &self,
        domain: &str,
        _discovery: &DiscoveryDocument,
    ) -> Option<RevocationDocument> {
        let dir = self.revocation_dir.as_ref()?;
        let path = dir.join(format!("{}.revocations.json", domain));
        let text = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&text).ok()
    }
}

/// Resolves documents from an in-memory trust bundle.
pub struct TrustBundleResolver {
    bundle: TrustBundle,
}

impl TrustBundleResolver {
    /// Wraps a loaded bundle.
    pub fn new(bundle: TrustBundle) -> Self {
        Self { bundle }
    }

    /// Parses a bundle from JSON and wraps it.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(TrustBundle::from_json(json)?))
    }
}

impl Resolver for TrustBundleResolver {
    fn resolve_discovery(&self, domain: &str) -> Option<DiscoveryDocument> {
        self.bundle.find_discovery(domain).cloned()
    }

    fn resolve_revocation(
        &self,
        domain: &str,
        _discovery: &DiscoveryDocument,
    ) -> Option<RevocationDocument> {
        self.bundle.find_revocation(domain).cloned()
    }
}

/// Tries constituent resolvers in order; first non-`None` wins.
pub struct ChainResolver {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ChainResolver {
    /// Creates a chain over an ordered list of resolvers.
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Self { resolvers }
    }

    /// Appends a resolver to the end of the chain.
    pub fn push(&mut self, resolver: Box<dyn Resolver>) {
        self.resolvers.push(resolver);
    }
}

impl Resolver for ChainResolver {
    fn resolve_discovery(&self, domain: &str) -> Option<DiscoveryDocument> {
        self.resolvers
            .iter()
            .find_map(|r| r.resolve_discovery(domain))
    }

    fn resolve_revocation(
        &self,
        domain: &str,
        discovery: &DiscoveryDocument,
    ) -> Option<RevocationDocument> {
        self.resolvers
            .iter()
            .find_map(|r| r.resolve_revocation(domain, discovery))
    }
}
