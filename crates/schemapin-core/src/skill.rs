//! # Skill Signing and Verification
//!
//! A skill is a directory of files signed as a unit. Canonicalization
//! reduces the tree to a root hash that is independent of filesystem
//! traversal order and host OS path separators:
//!
//! 1. Enumerate regular files; skip symlinks and the signature manifest
//!    (`.schemapin.sig`) at any depth.
//! 2. Compute each file's forward-slash relative path; non-UTF-8 paths
//!    are an error.
//! 3. Per file: `SHA-256(utf8(relpath) || file_bytes)`, recorded in the
//!    manifest as `"sha256:" + hex`.
//! 4. Root hash: SHA-256 over the concatenation of the per-file hex
//!    digests, ordered by relative path.
//! 5. An empty tree is an error.
//!
//! Any single-file edit, addition, removal, or rename changes the root
//! hash; adding a symlink or touching mtimes does not. The signature
//! envelope written next to the files records the manifest, so tooling
//! can explain *which* files changed when verification fails.

use crate::error::{Result, SchemaPinError};
use crate::result::{ErrorCode, VerificationResult};
use chrono::Utc;
use regex::Regex;
use schemapin_crypto::Hash;
use schemapin_discovery::{DiscoveryDocument, Resolver, RevocationDocument};
use schemapin_pinning::PinStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Reserved filename of the signature envelope at the skill root.
pub const SIGNATURE_FILENAME: &str = ".schemapin.sig";

/// Protocol version written into new signature envelopes.
pub const SCHEMAPIN_VERSION: &str = "1.3";

/// The `.schemapin.sig` signature envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSignature {
    /// Protocol version the envelope was written with.
    pub schemapin_version: String,

    /// Name of the skill, from `SKILL.md` frontmatter or an override.
    pub skill_name: String,

    /// `"sha256:" + hex` of the directory root hash at signing time.
    pub skill_hash: String,

    /// Base64-encoded DER ECDSA signature over the root hash.
    pub signature: String,

    /// RFC 3339 UTC signing timestamp.
    pub signed_at: String,

    /// Domain whose discovery key signed this skill.
    pub domain: String,

    /// Key identifier, by convention the signer's fingerprint.
    pub signer_kid: String,

    /// Relative path to `"sha256:" + hex` per-file digest map.
    pub file_manifest: BTreeMap<String, String>,
}

/// Which files differ between a signed and a current manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TamperReport {
    /// Files present in both manifests with different digests.
    pub modified: Vec<String>,

    /// Files present now but absent from the signed manifest.
    pub added: Vec<String>,

    /// Files in the signed manifest but missing now.
    pub removed: Vec<String>,
}

impl TamperReport {
    /// Returns true if the manifests agree completely.
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Walks a skill directory and computes `(root_hash, manifest)`.
///
/// # Errors
///
/// Returns [`SchemaPinError::SkillCanonicalization`] for unreadable
/// entries, non-UTF-8 paths, or a tree with no signable files.
pub fn canonicalize_skill(skill_dir: &Path) -> Result<(Hash, BTreeMap<String, String>)> {
    let mut manifest = BTreeMap::new();

    for entry in WalkDir::new(skill_dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| SchemaPinError::SkillCanonicalization(e.to_string()))?;

        if entry.file_type().is_symlink() || !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_str() == Some(SIGNATURE_FILENAME) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(skill_dir)
            .map_err(|e| SchemaPinError::SkillCanonicalization(e.to_string()))?;
        let relative = relative.to_str().ok_or_else(|| {
            SchemaPinError::SkillCanonicalization(format!(
                "non-UTF-8 path in skill directory: {}",
                entry.path().display()
            ))
        })?;
        // Forward slashes regardless of host OS.
        let relative = relative.replace('\\', "/");

        let bytes = fs::read(entry.path())
            .map_err(|e| SchemaPinError::SkillCanonicalization(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(relative.as_bytes());
        hasher.update(&bytes);
        manifest.insert(relative, format!("sha256:{}", hex::encode(hasher.finalize())));
    }

    if manifest.is_empty() {
        return Err(SchemaPinError::SkillCanonicalization(format!(
            "skill directory is empty or contains no signable files: {}",
            skill_dir.display()
        )));
    }

    // The map iterates in relative-path order, which is exactly the
    // ordering the root hash is defined over.
    let mut root = Sha256::new();
    for digest in manifest.values() {
        let hex_part = digest.split_once(':').map(|(_, hex)| hex).unwrap_or(digest);
        root.update(hex_part.as_bytes());
    }

    Ok((root.finalize().into(), manifest))
}

/// Extracts the skill name from `SKILL.md` frontmatter.
///
/// Falls back to the directory basename when `SKILL.md` is missing or
/// carries no `name:` field.
pub fn parse_skill_name(skill_dir: &Path) -> String {
    if let Ok(text) = fs::read_to_string(skill_dir.join("SKILL.md")) {
        if let Some(name) = frontmatter_name(&text) {
            return name;
        }
    }

    let resolved = skill_dir
        .canonicalize()
        .unwrap_or_else(|_| skill_dir.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "skill".to_string())
}

fn frontmatter_name(text: &str) -> Option<String> {
    let frontmatter = Regex::new(r"(?s)^---\s*\n(.*?)\n---")
        .ok()?
        .captures(text)?
        .get(1)?
        .as_str()
        .to_string();

    let name = Regex::new(r##"(?m)^name:\s*['"]?([^'"#\n]+?)['"]?\s*$"##)
        .ok()?
        .captures(&frontmatter)?
        .get(1)?
        .as_str()
        .trim()
        .to_string();

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Reads and parses the `.schemapin.sig` envelope from a skill directory.
///
/// # Errors
///
/// Returns [`SchemaPinError::Envelope`] if the file is missing or does
/// not parse as an envelope.
pub fn load_signature(skill_dir: &Path) -> Result<SkillSignature> {
    let path = skill_dir.join(SIGNATURE_FILENAME);
    let text = fs::read_to_string(&path)
        .map_err(|e| SchemaPinError::Envelope(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| SchemaPinError::Envelope(format!("{}: {}", path.display(), e)))
}

/// Canonicalizes a skill directory, signs its root hash, and writes the
/// `.schemapin.sig` envelope.
///
/// `signer_kid` defaults to the signing key's fingerprint, `skill_name`
/// to the `SKILL.md` frontmatter name (or the directory basename).
///
/// # Errors
///
/// Fails on an unloadable private key, an uncanonicalizable directory,
/// or an unwritable envelope.
pub fn sign_skill(
    skill_dir: &Path,
    private_key_pem: &str,
    domain: &str,
    signer_kid: Option<&str>,
    skill_name: Option<&str>,
) -> Result<SkillSignature> {
    let key = schemapin_crypto::load_private_key_pem(private_key_pem)?;
    let (root_hash, manifest) = canonicalize_skill(skill_dir)?;

    let skill_name = match skill_name {
        Some(name) => name.to_string(),
        None => parse_skill_name(skill_dir),
    };
    let signer_kid = match signer_kid {
        Some(kid) => kid.to_string(),
        None => schemapin_crypto::key_fingerprint(key.verifying_key())?,
    };

    let signature = schemapin_crypto::sign_hash(&root_hash, &key)?;

    let envelope = SkillSignature {
        schemapin_version: SCHEMAPIN_VERSION.to_string(),
        skill_name,
        skill_hash: format!("sha256:{}", hex::encode(root_hash)),
        signature,
        signed_at: Utc::now().to_rfc3339(),
        domain: domain.to_string(),
        signer_kid,
        file_manifest: manifest,
    };

    let text = format!("{}\n", serde_json::to_string_pretty(&envelope)?);
    fs::write(skill_dir.join(SIGNATURE_FILENAME), text)?;
    debug!("signed skill '{}' for {}", envelope.skill_name, domain);

    Ok(envelope)
}

/// Verifies a signed skill directory against pre-resolved trust data.
///
/// The same seven steps as the schema path, with the directory root
/// hash standing in for the canonical schema digest. The envelope is
/// read from the directory unless supplied by the caller.
pub fn verify_skill_offline(
    skill_dir: &Path,
    discovery: &DiscoveryDocument,
    signature_data: Option<SkillSignature>,
    revocation: Option<&RevocationDocument>,
    pin_store: Option<&dyn PinStore>,
    tool_id: Option<&str>,
) -> VerificationResult {
    // Step 0: locate the envelope.
    let envelope = match signature_data {
        Some(envelope) => envelope,
        None => match load_signature(skill_dir) {
            Ok(envelope) => envelope,
            Err(e) => {
                return VerificationResult::failure(
                    None,
                    ErrorCode::SignatureInvalid,
                    format!("No usable {} in skill directory: {}", SIGNATURE_FILENAME, e),
                );
            }
        },
    };

    let domain = envelope.domain.clone();
    let tool_id = match tool_id {
        Some(tool_id) => tool_id.to_string(),
        None if !envelope.skill_name.is_empty() => envelope.skill_name.clone(),
        None => parse_skill_name(skill_dir),
    };

    // Steps 1-4: discovery, key, revocation, pin.
    let trusted = match crate::engine::establish_trust(
        &domain,
        &tool_id,
        discovery,
        revocation,
        pin_store,
    ) {
        Ok(trusted) => trusted,
        Err(failure) => return *failure,
    };

    // Step 5: recompute the directory root hash.
    let (root_hash, _manifest) = match canonicalize_skill(skill_dir) {
        Ok(result) => result,
        Err(e) => {
            return VerificationResult::failure(
                Some(&domain),
                ErrorCode::SchemaCanonicalizationFailed,
                format!("Failed to canonicalize skill: {}", e),
            );
        }
    };

    // Step 6: verify the envelope signature over the root hash.
    if !schemapin_crypto::verify_signature(&root_hash, &envelope.signature, &trusted.key) {
        return VerificationResult::failure(
            Some(&domain),
            ErrorCode::SignatureInvalid,
            "Signature verification failed",
        );
    }

    // Step 7: success.
    debug!("skill '{}' verified for {}", tool_id, domain);
    let result = VerificationResult::success(&domain)
        .with_developer_name(discovery.developer_name.clone())
        .with_key_pinning(trusted.pinning);
    crate::engine::discovery_warnings(result, discovery)
}

/// Verifies a signed skill, resolving discovery for an asserted domain.
///
/// The caller-asserted domain must match the envelope's `domain` field;
/// a disagreement is `domain_mismatch`. Discovery resolution failure is
/// `discovery_fetch_failed`.
pub fn verify_skill_with_resolver(
    skill_dir: &Path,
    domain: &str,
    resolver: &dyn Resolver,
    pin_store: Option<&dyn PinStore>,
    tool_id: Option<&str>,
) -> VerificationResult {
    let envelope = match load_signature(skill_dir) {
        Ok(envelope) => envelope,
        Err(e) => {
            return VerificationResult::failure(
                Some(domain),
                ErrorCode::SignatureInvalid,
                format!("No usable {} in skill directory: {}", SIGNATURE_FILENAME, e),
            );
        }
    };

    if envelope.domain != domain {
        return VerificationResult::failure(
            Some(domain),
            ErrorCode::DomainMismatch,
            format!(
                "Envelope signed for domain '{}', verification requested for '{}'",
                envelope.domain, domain
            ),
        );
    }

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

    verify_skill_offline(
        skill_dir,
        &discovery,
        Some(envelope),
        revocation.as_ref(),
        pin_store,
        tool_id,
    )
}

/// Compares a current manifest against the signed one.
///
/// Used by tooling to explain why steps 5/6 failed. All three lists are
/// sorted by relative path.
pub fn detect_tampered_files(
    current_manifest: &BTreeMap<String, String>,
    signed_manifest: &BTreeMap<String, String>,
) -> TamperReport {
    let current_keys: BTreeSet<&String> = current_manifest.keys().collect();
    let signed_keys: BTreeSet<&String> = signed_manifest.keys().collect();

    let added = current_keys
        .difference(&signed_keys)
        .map(|k| (*k).clone())
        .collect();
    let removed = signed_keys
        .difference(&current_keys)
        .map(|k| (*k).clone())
        .collect();
    let modified = current_keys
        .intersection(&signed_keys)
        .filter(|k| current_manifest[**k] != signed_manifest[**k])
        .map(|k| (*k).clone())
        .collect();

    TamperReport {
        modified,
        added,
        removed,
    }
}
