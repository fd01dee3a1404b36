//! # SchemaPin Crypto - Canonicalization, Keys, Signatures
//!
//! The cryptographic leaf crate of the SchemaPin workspace. It pins down
//! the byte-exact primitives every other layer builds on:
//!
//! 1. **Canonical JSON** - deterministic serialization so that
//!    semantically equal schemas hash identically across implementations.
//!
//! 2. **P-256 key management** - keypair generation, PKCS#8 /
//!    SubjectPublicKeyInfo PEM import and export, and canonical
//!    `sha256:<hex>` fingerprints over the re-serialized SPKI DER.
//!
//! 3. **ECDSA signatures** - sign/verify over caller-supplied 32-byte
//!    digests, DER on the wire, base64 for transport. Verification never
//!    errors; every failure mode is `false`.
//!
//! This crate performs no I/O and holds no state. Discovery, pinning,
//! and the verification flow live in the sibling crates.
//!
//! ## Example
//!
//! ```rust
//! use schemapin_crypto::{canonicalize, keys, sign};
//! use serde_json::json;
//!
//! let key = keys::generate_keypair();
//! let digest = canonicalize::canonicalize_and_hash(&json!({"name": "demo"}));
//!
//! let signature = sign::sign_hash(&digest, &key).unwrap();
//! assert!(sign::verify_signature(&digest, &signature, key.verifying_key()));
//! ```

pub mod canonicalize;
pub mod keys;
pub mod models;
pub mod sign;

pub use canonicalize::{canonicalize, canonicalize_and_hash, parse_schema};
pub use keys::{
    export_private_key_pem, export_public_key_pem, generate_keypair, key_fingerprint,
    load_private_key_pem, load_public_key_pem,
};
pub use models::{CryptoError, Hash, Result, HASH_SIZE};
pub use sign::{sign_digest, sign_hash, verify_digest, verify_signature};

// Re-export the key types so downstream crates do not need a direct
// p256 dependency to hold keys.
pub use p256::ecdsa::{SigningKey, VerifyingKey};
