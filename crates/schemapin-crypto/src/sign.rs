//! # ECDSA Signing and Verification
//!
//! Signs and verifies 32-byte digests with ECDSA over P-256. The digest
//! is computed by the caller (see the canonicalize module and the skill
//! tree hashing in the facade crate); the signer does not re-hash.
//!
//! Signatures are DER-encoded on the wire, base64-wrapped by the
//! transport helpers. Verifiers accept both randomized and deterministic
//! (RFC 6979) signatures — the verification equation does not care how
//! the nonce was chosen.
//!
//! Verification is total: malformed base64, malformed DER, and honest
//! mismatches all come back as `false`, never as an error.

use crate::models::{CryptoError, Hash, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};

/// Signs a pre-computed digest, returning the DER-encoded signature.
///
/// # Errors
///
/// Returns [`CryptoError::SigningFailed`] if the underlying ECDSA
/// operation rejects the input.
pub fn sign_digest(digest: &Hash, key: &SigningKey) -> Result<Vec<u8>> {
    let signature: Signature = key
        .sign_prehash(digest)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    Ok(signature.to_der().as_bytes().to_vec())
}

/// Verifies a DER-encoded signature over a pre-computed digest.
///
/// Returns `false` on any decode failure or mismatch.
pub fn verify_digest(digest: &Hash, signature_der: &[u8], key: &VerifyingKey) -> bool {
    match Signature::from_der(signature_der) {
        Ok(signature) => key.verify_prehash(digest, &signature).is_ok(),
        Err(_) => false,
    }
}

/// Signs a digest and base64-encodes the DER signature for transport.
pub fn sign_hash(digest: &Hash, key: &SigningKey) -> Result<String> {
    Ok(BASE64.encode(sign_digest(digest, key)?))
}

/// Verifies a base64-encoded DER signature over a digest.
///
/// Returns `false` on any decode failure or mismatch.
pub fn verify_signature(digest: &Hash, signature_b64: &str, key: &VerifyingKey) -> bool {
    match BASE64.decode(signature_b64) {
        Ok(der) => verify_digest(digest, &der, key),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonicalize::canonicalize_and_hash;
    use crate::keys::generate_keypair;
    use serde_json::json;

    #[test]
    fn test_sign_verify_roundtrip() {
        let key = generate_keypair();
        let digest = canonicalize_and_hash(&json!({"name": "t", "description": "A test"}));

        let signature = sign_digest(&digest, &key).unwrap();
        assert!(verify_digest(&digest, &signature, key.verifying_key()));
    }

    #[test]
    fn test_digest_change_breaks_verification() {
        let key = generate_keypair();
        let digest = canonicalize_and_hash(&json!({"name": "t"}));
        let signature = sign_digest(&digest, &key).unwrap();

        let mut flipped = digest;
        flipped[0] ^= 0x01;
        assert!(!verify_digest(&flipped, &signature, key.verifying_key()));
    }

    #[test]
    fn test_signature_bitflip_breaks_verification() {
        let key = generate_keypair();
        let digest = canonicalize_and_hash(&json!({"name": "t"}));
        let mut signature = sign_digest(&digest, &key).unwrap();

        // Flip a bit in the encoded r/s payload, past the DER header.
        let last = signature.len() - 1;
        signature[last] ^= 0x01;
        assert!(!verify_digest(&digest, &signature, key.verifying_key()));
    }

    #[test]
    fn test_garbage_signature_returns_false() {
        let key = generate_keypair();
        let digest = canonicalize_and_hash(&json!(1));

        assert!(!verify_digest(&digest, b"not der", key.verifying_key()));
        assert!(!verify_digest(&digest, &[], key.verifying_key()));
        assert!(!verify_signature(&digest, "%%% not base64 %%%", key.verifying_key()));
        assert!(!verify_signature(&digest, "", key.verifying_key()));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let signer = generate_keypair();
        let other = generate_keypair();
        let digest = canonicalize_and_hash(&json!({"a": 1}));

        let signature_b64 = sign_hash(&digest, &signer).unwrap();
        assert!(verify_signature(&digest, &signature_b64, signer.verifying_key()));
        assert!(!verify_signature(&digest, &signature_b64, other.verifying_key()));
    }

    #[test]
    fn test_base64_transport_roundtrip() {
        let key = generate_keypair();
        let digest = canonicalize_and_hash(&json!({"x": [1, 2, 3]}));

        let signature_b64 = sign_hash(&digest, &key).unwrap();
        let der = BASE64.decode(&signature_b64).unwrap();
        assert!(verify_digest(&digest, &der, key.verifying_key()));
        assert!(verify_signature(&digest, &signature_b64, key.verifying_key()));
    }
}
