//! # Workflow Facades
//!
//! Thin, stateful wrappers for the two user-facing paths:
//!
//! - [`SchemaSigningWorkflow`] holds a parsed private key and emits
//!   base64 schema signatures.
//! - [`SchemaVerificationWorkflow`] owns a resolver and a pin store and
//!   runs the engine, with an `auto_pin` switch controlling whether
//!   first-use pins happen implicitly.
//!
//! Interactive confirmation is deliberately outside the core: with
//! `auto_pin` off and no existing pin, the engine runs *without* the pin
//! store and the result carries no `key_pinning` block. The caller makes
//! its own trust decision and then calls [`SchemaVerificationWorkflow::pin`].

use crate::engine::{verify_schema, verify_schema_with_resolver};
use crate::error::Result;
use crate::result::VerificationResult;
use schemapin_crypto::{canonicalize_and_hash, sign_hash, SigningKey};
use schemapin_discovery::Resolver;
use schemapin_pinning::{PinStatus, PinStore};
use serde_json::Value;
use tracing::debug;

/// Options for constructing a [`SchemaVerificationWorkflow`].
pub struct VerificationOptions {
    /// Pin first-use keys without asking.
    ///
    /// With this off, unpinned tools verify without the pin store and
    /// the caller pins explicitly after its own confirmation flow.
    pub auto_pin: bool,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self { auto_pin: true }
    }
}

/// Publisher-side facade: sign schemas with one private key.
pub struct SchemaSigningWorkflow {
    signing_key: SigningKey,
}

impl SchemaSigningWorkflow {
    /// Parses the private key PEM and holds it for signing.
    ///
    /// # Errors
    ///
    /// Fails if the PEM is not an unencrypted PKCS#8 P-256 key.
    pub fn new(private_key_pem: &str) -> Result<Self> {
        Ok(Self {
            signing_key: schemapin_crypto::load_private_key_pem(private_key_pem)?,
        })
    }

    /// Canonicalizes and signs a schema, returning the base64 signature.
    pub fn sign_schema(&self, schema: &Value) -> Result<String> {
        let digest = canonicalize_and_hash(schema);
        Ok(sign_hash(&digest, &self.signing_key)?)
    }
}

/// Consumer-side facade: resolve, verify, and pin schemas.
pub struct SchemaVerificationWorkflow {
    resolver: Box<dyn Resolver>,
    pin_store: Box<dyn PinStore>,
    options: VerificationOptions,
}

impl SchemaVerificationWorkflow {
    /// Builds a workflow over a resolver and a pin store.
    pub fn new(
        resolver: Box<dyn Resolver>,
        pin_store: Box<dyn PinStore>,
        options: VerificationOptions,
    ) -> Self {
        Self {
            resolver,
            pin_store,
            options,
        }
    }

    /// Verifies a schema, honoring the `auto_pin` policy.
    ///
    /// Pinned tools always go through the pin store so rotation is
    /// caught. Unpinned tools only touch the store when `auto_pin` is
    /// on; otherwise the result reports no `key_pinning` and the caller
    /// decides whether to [`pin`](Self::pin).
    pub fn verify_schema(
        &self,
        schema: &Value,
        signature_b64: &str,
        domain: &str,
        tool_id: &str,
    ) -> VerificationResult {
        let already_pinned = matches!(
            self.pin_store.get_pinned(tool_id, domain),
            Ok(Some(_))
        );

        if already_pinned || self.options.auto_pin {
            verify_schema_with_resolver(
                schema,
                signature_b64,
                domain,
                tool_id,
                self.resolver.as_ref(),
                Some(self.pin_store.as_ref()),
            )
        } else {
            debug!(
                "'{}' at {} is unpinned and auto_pin is off; skipping pin store",
                tool_id, domain
            );
            verify_schema_with_resolver(
                schema,
                signature_b64,
                domain,
                tool_id,
                self.resolver.as_ref(),
                None,
            )
        }
    }

    /// Verifies a schema against caller-supplied discovery data,
    /// bypassing the resolver but honoring the same pin policy.
    pub fn verify_schema_offline(
        &self,
        schema: &Value,
        signature_b64: &str,
        domain: &str,
        tool_id: &str,
        discovery: &schemapin_discovery::DiscoveryDocument,
        revocation: Option<&schemapin_discovery::RevocationDocument>,
    ) -> VerificationResult {
        let already_pinned = matches!(
            self.pin_store.get_pinned(tool_id, domain),
            Ok(Some(_))
        );

        let pin_store = if already_pinned || self.options.auto_pin {
            Some(self.pin_store.as_ref())
        } else {
            None
        };

        verify_schema(
            schema,
            signature_b64,
            domain,
            tool_id,
            discovery,
            revocation,
            pin_store,
        )
    }

    /// Pins a fingerprint after the caller's own confirmation flow.
    pub fn pin(&self, tool_id: &str, domain: &str, fingerprint: &str) -> Result<PinStatus> {
        Ok(self.pin_store.check_and_pin(tool_id, domain, fingerprint)?)
    }

    /// Returns the pinned fingerprint for `(tool_id, domain)`, if any.
    pub fn pinned_fingerprint(&self, tool_id: &str, domain: &str) -> Result<Option<String>> {
        Ok(self.pin_store.get_pinned(tool_id, domain)?)
    }
}
