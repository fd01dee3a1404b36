//! # The Verification Engine
//!
//! One algorithm, applied uniformly to schemas and skills — the only
//! difference is what gets hashed in step 6:
//!
//! | Step | Check | Failure code |
//! |------|-------|--------------|
//! | 1 | Discovery carries a public-key PEM with the block marker | `discovery_invalid` |
//! | 2 | The PEM parses; fingerprint computed | `key_not_found` |
//! | 3 | Fingerprint absent from both revocation sources | `key_revoked` |
//! | 4 | TOFU pin check (when a store is supplied) | `key_pin_mismatch` |
//! | 5 | Canonicalize and hash the artifact | `schema_canonicalization_failed` |
//! | 6 | ECDSA signature verifies against the digest | `signature_invalid` |
//! | 7 | Success with pinning status and warnings | — |
//!
//! The pipeline is fail-closed and short-circuits at the first failing
//! step. The engine performs no I/O beyond what canonicalization needs,
//! caches nothing, mutates nothing but the pin store (and that only
//! through `check_and_pin`), and never returns an error: every failure
//! becomes a structured [`VerificationResult`].

use crate::result::{ErrorCode, KeyPinning, VerificationResult};
use schemapin_crypto::{canonicalize_and_hash, verify_signature, VerifyingKey};
use schemapin_discovery::{
    check_revocation_combined, DiscoveryDocument, Resolver, RevocationDocument, PUBLIC_KEY_MARKER,
};
use schemapin_pinning::{PinStatus, PinStore};
use serde_json::Value;
use tracing::{debug, warn};

/// Discovery schema version below which a warning is attached.
const CURRENT_DISCOVERY_VERSION: &str = "1.2";

/// A key that survived steps 1-4: loaded, unrevoked, and pin-checked.
pub(crate) struct TrustedKey {
    pub key: VerifyingKey,
    pub pinning: Option<KeyPinning>,
}

/// Runs steps 1-4 of the flow, shared by the schema and skill paths.
///
/// Returns the trusted key on success, or the finished failure result.
pub(crate) fn establish_trust(
    domain: &str,
    tool_id: &str,
    discovery: &DiscoveryDocument,
    revocation: Option<&RevocationDocument>,
    pin_store: Option<&dyn PinStore>,
) -> Result<TrustedKey, Box<VerificationResult>> {
    // Step 1: structural discovery validation.
    if !discovery.public_key_pem.contains(PUBLIC_KEY_MARKER) {
        return Err(Box::new(VerificationResult::failure(
            Some(domain),
            ErrorCode::DiscoveryInvalid,
            "Discovery document missing or invalid public_key_pem",
        )));
    }

    // Step 2: load the key and compute its fingerprint.
    let key = match schemapin_crypto::load_public_key_pem(&discovery.public_key_pem) {
        Ok(key) => key,
        Err(e) => {
            return Err(Box::new(VerificationResult::failure(
                Some(domain),
                ErrorCode::KeyNotFound,
                format!("Failed to load public key: {}", e),
            )));
        }
    };
    let fingerprint = match schemapin_crypto::key_fingerprint(&key) {
        Ok(fingerprint) => fingerprint,
        Err(e) => {
            return Err(Box::new(VerificationResult::failure(
                Some(domain),
                ErrorCode::KeyNotFound,
                format!("Failed to fingerprint public key: {}", e),
            )));
        }
    };
    debug!("verifying '{}' against key {}", tool_id, fingerprint);

    // Step 3: revocation, both the simple list and the standalone doc.
    let simple = discovery.revoked_keys.as_deref();
    if let Err(e) = check_revocation_combined(simple, revocation, &fingerprint) {
        warn!("revoked key presented for '{}': {}", tool_id, e);
        return Err(Box::new(VerificationResult::failure(
            Some(domain),
            ErrorCode::KeyRevoked,
            e.to_string(),
        )));
    }

    // Step 4: TOFU pin check.
    let pinning = match pin_store {
        Some(store) => match store.check_and_pin(tool_id, domain, &fingerprint) {
            Ok(PinStatus::Changed) => {
                warn!("key fingerprint changed for '{}' at {}", tool_id, domain);
                return Err(Box::new(VerificationResult::failure(
                    Some(domain),
                    ErrorCode::KeyPinMismatch,
                    "Key fingerprint changed since last use",
                )));
            }
            Ok(status) => Some(KeyPinning {
                status,
                first_seen: None,
            }),
            Err(e) => {
                // The pin state could not be proven unchanged: fail closed.
                warn!("pin store failure for '{}': {}", tool_id, e);
                return Err(Box::new(VerificationResult::failure(
                    Some(domain),
                    ErrorCode::KeyPinMismatch,
                    format!("Pin store unavailable: {}", e),
                )));
            }
        },
        None => None,
    };

    Ok(TrustedKey { key, pinning })
}

/// Attaches non-fatal warnings derived from the discovery document.
pub(crate) fn discovery_warnings(
    result: VerificationResult,
    discovery: &DiscoveryDocument,
) -> VerificationResult {
    let version = discovery.schema_version.as_str();
    if !version.is_empty() && version < CURRENT_DISCOVERY_VERSION {
        return result.with_warning(format!(
            "Discovery uses schema version {}, consider upgrading to {}",
            version, CURRENT_DISCOVERY_VERSION
        ));
    }
    result
}

/// Verifies a schema against pre-resolved discovery and revocation data.
///
/// This is the offline entry point: all trust inputs are supplied by the
/// caller. See the module docs for the step/error-code table.
///
/// # Example
///
/// ```rust,no_run
/// use schemapin_core::engine::verify_schema;
/// use schemapin_discovery::DiscoveryDocument;
/// use schemapin_pinning::MemoryPinStore;
/// use serde_json::json;
///
/// let discovery = DiscoveryDocument::new("1.2", "...public key pem...");
/// let pin_store = MemoryPinStore::new();
///
/// let result = verify_schema(
///     &json!({"name": "demo"}),
///     "...base64 signature...",
///     "example.com",
///     "demo",
///     &discovery,
///     None,
///     Some(&pin_store),
/// );
/// assert!(result.valid || result.error_code.is_some());
/// ```
pub fn verify_schema(
    schema: &Value,
    signature_b64: &str,
    domain: &str,
    tool_id: &str,
    discovery: &DiscoveryDocument,
    revocation: Option<&RevocationDocument>,
    pin_store: Option<&dyn PinStore>,
) -> VerificationResult {
    // Steps 1-4.
    let trusted = match establish_trust(domain, tool_id, discovery, revocation, pin_store) {
        Ok(trusted) => trusted,
        Err(failure) => return *failure,
    };

    // Step 5: canonicalize and hash.
    let digest = canonicalize_and_hash(schema);

    // Step 6: verify the signature over the digest.
    if !verify_signature(&digest, signature_b64, &trusted.key) {
        return VerificationResult::failure(
            Some(domain),
            ErrorCode::SignatureInvalid,
            "Signature verification failed",
        );
    }

    // Step 7: success.
    debug!("schema '{}' verified for {}", tool_id, domain);
    let result = VerificationResult::success(domain)
        .with_developer_name(discovery.developer_name.clone())
        .with_key_pinning(trusted.pinning);
    discovery_warnings(result, discovery)
}

/// Verifies a schema, resolving discovery and revocation first.
///
/// A resolver that returns no discovery yields `discovery_fetch_failed`;
/// everything else delegates to [`verify_schema`].
pub fn verify_schema_with_resolver(
    schema: &Value,
    signature_b64: &str,
    domain: &str,
    tool_id: &str,
    resolver: &dyn Resolver,
    pin_store: Option<&dyn PinStore>,
) -> VerificationResult {
    let discovery = match resolver.resolve_discovery(domain) {
        Some(discovery) => discovery,
        None => {
            return VerificationResult::failure(
                Some(domain),
                ErrorCode::DiscoveryFetchFailed,
                format!("Could not resolve discovery for domain: {}", domain),
            );
        }
    };

    let revocation = resolver.resolve_revocation(domain, &discovery);

    verify_schema(
        schema,
        signature_b64,
        domain,
        tool_id,
        &discovery,
        revocation.as_ref(),
        pin_store,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemapin_crypto::{
        export_public_key_pem, generate_keypair, key_fingerprint, sign_hash, SigningKey,
    };
    use schemapin_discovery::RevocationReason;
    use schemapin_pinning::MemoryPinStore;
    use serde_json::json;

    fn test_schema() -> Value {
        json!({"name": "t", "description": "A test"})
    }

    fn sign_test_schema(key: &SigningKey) -> String {
        let digest = canonicalize_and_hash(&test_schema());
        sign_hash(&digest, key).unwrap()
    }

    fn test_discovery(key: &SigningKey) -> DiscoveryDocument {
        let mut discovery = DiscoveryDocument::new(
            "1.2",
            export_public_key_pem(key.verifying_key()).unwrap(),
        );
        discovery.developer_name = Some("Test Dev".to_string());
        discovery
    }

    #[test]
    fn test_happy_path_first_use() {
        let key = generate_keypair();
        let signature = sign_test_schema(&key);
        let discovery = test_discovery(&key);
        let pins = MemoryPinStore::new();

        let result = verify_schema(
            &test_schema(),
            &signature,
            "example.com",
            "t",
            &discovery,
            None,
            Some(&pins),
        );

        assert!(result.valid, "{:?}", result);
        assert_eq!(result.developer_name.as_deref(), Some("Test Dev"));
        assert_eq!(result.key_pinning.unwrap().status, PinStatus::FirstUse);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_discovery() {
        let key = generate_keypair();
        let signature = sign_test_schema(&key);
        let discovery = DiscoveryDocument::new("1.2", "no marker here");

        let result = verify_schema(
            &test_schema(),
            &signature,
            "example.com",
            "t",
            &discovery,
            None,
            None,
        );

        assert!(!result.valid);
        assert_eq!(result.error_code, Some(ErrorCode::DiscoveryInvalid));
    }

    #[test]
    fn test_unparseable_key() {
        let key = generate_keypair();
        let signature = sign_test_schema(&key);
        let discovery = DiscoveryDocument::new(
            "1.2",
            "-----BEGIN PUBLIC KEY-----\nnot base64 at all\n-----END PUBLIC KEY-----\n",
        );

        let result = verify_schema(
            &test_schema(),
            &signature,
            "example.com",
            "t",
            &discovery,
            None,
            None,
        );

        assert_eq!(result.error_code, Some(ErrorCode::KeyNotFound));
    }

    #[test]
    fn test_revoked_in_simple_list() {
        let key = generate_keypair();
        let signature = sign_test_schema(&key);
        let mut discovery = test_discovery(&key);
        let fingerprint = key_fingerprint(key.verifying_key()).unwrap();
        discovery.revoked_keys = Some(vec![fingerprint]);

        let result = verify_schema(
            &test_schema(),
            &signature,
            "example.com",
            "t",
            &discovery,
            None,
            None,
        );

        assert_eq!(result.error_code, Some(ErrorCode::KeyRevoked));
    }

    #[test]
    fn test_revoked_in_standalone_document() {
        let key = generate_keypair();
        let signature = sign_test_schema(&key);
        let discovery = test_discovery(&key);

        let mut revocation = RevocationDocument::new("example.com");
        revocation.add_revoked_key(
            &key_fingerprint(key.verifying_key()).unwrap(),
            RevocationReason::KeyCompromise,
        );

        let result = verify_schema(
            &test_schema(),
            &signature,
            "example.com",
            "t",
            &discovery,
            Some(&revocation),
            None,
        );

        assert_eq!(result.error_code, Some(ErrorCode::KeyRevoked));
    }

    #[test]
    fn test_tampered_schema_fails_signature() {
        let key = generate_keypair();
        let signature = sign_test_schema(&key);
        let discovery = test_discovery(&key);

        let tampered = json!({"name": "t", "description": "TAMPERED"});
        let result = verify_schema(
            &tampered,
            &signature,
            "example.com",
            "t",
            &discovery,
            None,
            None,
        );

        assert!(!result.valid);
        assert_eq!(result.error_code, Some(ErrorCode::SignatureInvalid));
    }

    #[test]
    fn test_key_rotation_hits_pin() {
        let pins = MemoryPinStore::new();

        // First verification pins key one.
        let key1 = generate_keypair();
        let result = verify_schema(
            &test_schema(),
            &sign_test_schema(&key1),
            "example.com",
            "t",
            &test_discovery(&key1),
            None,
            Some(&pins),
        );
        assert!(result.valid);

        // The publisher rotates to key two; the pin rejects it even
        // though the signature itself is good.
        let key2 = generate_keypair();
        let result = verify_schema(
            &test_schema(),
            &sign_test_schema(&key2),
            "example.com",
            "t",
            &test_discovery(&key2),
            None,
            Some(&pins),
        );
        assert!(!result.valid);
        assert_eq!(result.error_code, Some(ErrorCode::KeyPinMismatch));
    }

    #[test]
    fn test_second_use_reports_pinned() {
        let key = generate_keypair();
        let signature = sign_test_schema(&key);
        let discovery = test_discovery(&key);
        let pins = MemoryPinStore::new();

        let first = verify_schema(
            &test_schema(), &signature, "example.com", "t", &discovery, None, Some(&pins),
        );
        assert_eq!(first.key_pinning.unwrap().status, PinStatus::FirstUse);

        let second = verify_schema(
            &test_schema(), &signature, "example.com", "t", &discovery, None, Some(&pins),
        );
        assert_eq!(second.key_pinning.unwrap().status, PinStatus::Pinned);
    }

    #[test]
    fn test_stale_schema_version_warns() {
        let key = generate_keypair();
        let signature = sign_test_schema(&key);
        let mut discovery = test_discovery(&key);
        discovery.schema_version = "1.1".to_string();

        let result = verify_schema(
            &test_schema(),
            &signature,
            "example.com",
            "t",
            &discovery,
            None,
            None,
        );

        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("1.1"));
    }

    #[test]
    fn test_resolver_wrapper_unknown_domain() {
        use schemapin_discovery::{TrustBundle, TrustBundleResolver};

        let resolver = TrustBundleResolver::new(TrustBundle::new());
        let key = generate_keypair();

        let result = verify_schema_with_resolver(
            &test_schema(),
            &sign_test_schema(&key),
            "unknown.example",
            "t",
            &resolver,
            None,
        );

        assert!(!result.valid);
        assert_eq!(result.error_code, Some(ErrorCode::DiscoveryFetchFailed));
    }

    #[test]
    fn test_resolver_wrapper_bundle_hit() {
        use schemapin_discovery::{TrustBundle, TrustBundleResolver};

        let key = generate_keypair();
        let mut bundle = TrustBundle::new();
        bundle.add_document("example.com", test_discovery(&key));
        let resolver = TrustBundleResolver::new(bundle);

        let result = verify_schema_with_resolver(
            &test_schema(),
            &sign_test_schema(&key),
            "example.com",
            "t",
            &resolver,
            None,
        );

        assert!(result.valid, "{:?}", result);
    }

    #[test]
    fn test_resolver_supplies_revocation() {
        use schemapin_discovery::{TrustBundle, TrustBundleResolver};

        let key = generate_keypair();
        let mut bundle = TrustBundle::new();
        bundle.add_document("example.com", test_discovery(&key));

        let mut revocation = RevocationDocument::new("example.com");
        revocation.add_revoked_key(
            &key_fingerprint(key.verifying_key()).unwrap(),
            RevocationReason::Superseded,
        );
        bundle.add_revocation(revocation);

        let resolver = TrustBundleResolver::new(bundle);
        let result = verify_schema_with_resolver(
            &test_schema(),
            &sign_test_schema(&key),
            "example.com",
            "t",
            &resolver,
            None,
        );

        assert_eq!(result.error_code, Some(ErrorCode::KeyRevoked));
    }
}
