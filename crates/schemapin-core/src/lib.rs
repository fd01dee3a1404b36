//! # SchemaPin Core - Cryptographic Schema and Skill Verification
//!
//! SchemaPin protects consumers of AI tools from schema tampering and
//! key substitution. Publishers sign their artifacts with an ECDSA
//! P-256 key; consumers discover the public key over a well-known
//! channel, pin it on first use, and verify every artifact against it.
//!
//! This crate is the facade over the workspace: it owns the seven-step
//! verification flow and the user-facing signing/verification surfaces,
//! delegating primitives to the leaf crates.
//!
//! ## Threat Model
//!
//! | Threat | Defense |
//! |--------|---------|
//! | Schema tampering (rug pull) | Canonical hash + ECDSA signature |
//! | Skill file tampering | Directory root hash + ECDSA signature |
//! | Key substitution after first contact | TOFU pinning, `key_pin_mismatch` |
//! | Compromised or retired keys | Revocation lists and documents, `key_revoked` |
//! | Unauthorized signing domain (skills) | Envelope domain check, `domain_mismatch` |
//!
//! ## The Verification Flow
//!
//! ```text
//!  artifact + signature + domain
//!        │
//!        ▼
//!  ┌──────────┐   discovery,    ┌──────────────────────────────┐
//!  │ Resolver │───revocation───▶│      VerificationEngine      │
//!  └──────────┘                 │ 1 validate discovery         │
//!                               │ 2 load key + fingerprint     │
//!  ┌──────────┐    check_and_pin│ 3 check revocation           │
//!  │ PinStore │◀───────────────▶│ 4 TOFU pin                   │
//!  └──────────┘                 │ 5 canonicalize + hash        │
//!                               │ 6 verify ECDSA signature     │
//!                               │ 7 structured result          │
//!                               └──────────────────────────────┘
//! ```
//!
//! Schemas and skills run the same pipeline; only step 5 differs
//! (canonical JSON bytes vs. directory root hash).
//!
//! ## Example
//!
//! ```rust
//! use schemapin_core::{
//!     export_private_key_pem, export_public_key_pem, generate_keypair, verify_schema,
//!     DiscoveryDocument, MemoryPinStore, SchemaSigningWorkflow,
//! };
//! use serde_json::json;
//!
//! // Publisher side.
//! let key = generate_keypair();
//! let signer =
//!     SchemaSigningWorkflow::new(&export_private_key_pem(&key).unwrap()).unwrap();
//! let schema = json!({"name": "t", "description": "A test"});
//! let signature = signer.sign_schema(&schema).unwrap();
//!
//! // Consumer side.
//! let discovery = DiscoveryDocument::new(
//!     "1.2",
//!     export_public_key_pem(key.verifying_key()).unwrap(),
//! );
//! let pins = MemoryPinStore::new();
//! let result = verify_schema(
//!     &schema, &signature, "example.com", "t", &discovery, None, Some(&pins),
//! );
//! assert!(result.valid);
//! ```

pub mod engine;
pub mod error;
pub mod result;
pub mod skill;
pub mod workflow;

pub use engine::{verify_schema, verify_schema_with_resolver};
pub use error::{Result, SchemaPinError};
pub use result::{ErrorCode, KeyPinning, VerificationResult};
pub use skill::{
    canonicalize_skill, detect_tampered_files, load_signature, parse_skill_name, sign_skill,
    verify_skill_offline, verify_skill_with_resolver, SkillSignature, TamperReport,
    SCHEMAPIN_VERSION, SIGNATURE_FILENAME,
};
pub use workflow::{SchemaSigningWorkflow, SchemaVerificationWorkflow, VerificationOptions};

// Re-export the component types callers need to drive the engine.
pub use schemapin_crypto::{
    canonicalize, canonicalize_and_hash, export_private_key_pem, export_public_key_pem,
    generate_keypair, key_fingerprint, load_private_key_pem, load_public_key_pem, parse_schema,
    SigningKey, VerifyingKey,
};
pub use schemapin_discovery::{
    create_well_known_response, ChainResolver, DiscoveryDocument, LocalFileResolver, Resolver,
    RevocationDocument, RevocationReason, TrustBundle, TrustBundleResolver, WellKnownResolver,
};
pub use schemapin_pinning::{DurablePinStore, MemoryPinStore, PinStatus, PinStore, PinnedKey};
