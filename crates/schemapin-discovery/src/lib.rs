//! # SchemaPin Discovery - Key Discovery, Revocation, Trust Bundles
//!
//! This crate defines the documents a publisher serves and the resolvers
//! a verifier uses to find them:
//!
//! - **Discovery documents** - a publisher's public key and policy,
//!   served at `https://<domain>/.well-known/schemapin.json`.
//!
//! - **Revocation documents** - standalone, cacheable lists of revoked
//!   key fingerprints with a closed reason vocabulary.
//!
//! - **Trust bundles** - offline multi-domain snapshots of both, with
//!   the flattened discovery entry shape on the wire.
//!
//! - **Resolvers** - the [`Resolver`] trait plus well-known, local-file,
//!   bundle, and chain implementations. Resolvers are pure data sources:
//!   they fetch and shape-check, never verify.
//!
//! ## Threat Model
//!
//! Discovery is the trust root of the system: a verifier that fetches
//! the wrong key verifies the wrong publisher. The defenses layered on
//! top of this crate are revocation checking and TOFU pinning in the
//! verification engine; this crate's own obligations are strict shape
//! validation, bounded network timeouts, and collapsing every fetch
//! failure to "not found" so callers cannot mistake an error for a
//! document.

pub mod bundle;
pub mod discovery;
pub mod error;
pub mod resolver;
pub mod revocation;

pub use bundle::{BundledDiscovery, TrustBundle};
pub use discovery::{
    create_well_known_response, DiscoveryDocument, PUBLIC_KEY_MARKER, WELL_KNOWN_PATH,
};
pub use error::{DiscoveryError, Result};
pub use resolver::{
    ChainResolver, LocalFileResolver, Resolver, TrustBundleResolver, WellKnownResolver,
    DEFAULT_TIMEOUT,
};
pub use revocation::{
    check_revocation, check_revocation_combined, fetch_revocation_document, RevocationDocument,
    RevocationReason, RevokedKey,
};
