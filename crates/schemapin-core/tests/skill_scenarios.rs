//! # Skill Signing and Tamper-Detection Tests
//!
//! End-to-end coverage of the skill path: sign a directory, verify it,
//! mutate it in every way the root hash must notice, and confirm the
//! manifest diff explains each failure.

use schemapin_core::{
    canonicalize_skill, detect_tampered_files, load_signature, sign_skill, verify_skill_offline,
    verify_skill_with_resolver, DiscoveryDocument, DurablePinStore, ErrorCode, MemoryPinStore,
    PinStatus, PinStore, TrustBundle, TrustBundleResolver,
};
use schemapin_crypto::{
    export_private_key_pem, export_public_key_pem, generate_keypair, key_fingerprint, SigningKey,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_file(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Creates a small skill directory with frontmatter and assets.
fn make_skill(dir: &Path) {
    write_file(
        dir,
        "SKILL.md",
        "---\nname: web-scraper\ndescription: Scrapes pages\n---\n# original\n",
    );
    write_file(dir, "scripts/run.py", "print('hello')\n");
    write_file(dir, "data/config.json", "{\"retries\": 3}\n");
}

fn keypair_pems() -> (SigningKey, String, String) {
    let key = generate_keypair();
    let private_pem = export_private_key_pem(&key).unwrap();
    let public_pem = export_public_key_pem(key.verifying_key()).unwrap();
    (key, private_pem, public_pem)
}

fn discovery_for(public_pem: &str) -> DiscoveryDocument {
    let mut discovery = DiscoveryDocument::new("1.3", public_pem);
    discovery.developer_name = Some("Skill Dev".to_string());
    discovery
}

// =============================================================================
// SIGN + VERIFY
// =============================================================================

#[test]
fn test_sign_then_verify_offline() {
    let dir = TempDir::new().unwrap();
    make_skill(dir.path());
    let (_key, private_pem, public_pem) = keypair_pems();

    let envelope = sign_skill(dir.path(), &private_pem, "example.com", None, None).unwrap();
    assert_eq!(envelope.skill_name, "web-scraper");
    assert_eq!(envelope.domain, "example.com");
    assert_eq!(envelope.file_manifest.len(), 3);

    let pins = MemoryPinStore::new();
    let result = verify_skill_offline(
        dir.path(),
        &discovery_for(&public_pem),
        None,
        None,
        Some(&pins),
        None,
    );

    assert!(result.valid, "{:?}", result);
    assert_eq!(result.domain.as_deref(), Some("example.com"));
    assert_eq!(result.developer_name.as_deref(), Some("Skill Dev"));
    assert_eq!(result.key_pinning.unwrap().status, PinStatus::FirstUse);

    // The tool id defaulted to the envelope's skill name.
    assert!(pins.get_pinned("web-scraper", "example.com").unwrap().is_some());
}

#[test]
fn test_verify_with_resolver_and_domain_check() {
    let dir = TempDir::new().unwrap();
    make_skill(dir.path());
    let (_key, private_pem, public_pem) = keypair_pems();
    sign_skill(dir.path(), &private_pem, "example.com", None, None).unwrap();

    let mut bundle = TrustBundle::new();
    bundle.add_document("example.com", discovery_for(&public_pem));
    let resolver = TrustBundleResolver::new(bundle);

    let result = verify_skill_with_resolver(dir.path(), "example.com", &resolver, None, None);
    assert!(result.valid, "{:?}", result);

    // Asserting a different domain than the envelope's is a hard error,
    // surfaced before any fetch happens.
    let result = verify_skill_with_resolver(dir.path(), "other.com", &resolver, None, None);
    assert!(!result.valid);
    assert_eq!(result.error_code, Some(ErrorCode::DomainMismatch));
}

#[test]
fn test_resolver_miss_is_fetch_failure() {
    let dir = TempDir::new().unwrap();
    make_skill(dir.path());
    let (_key, private_pem, _public_pem) = keypair_pems();
    sign_skill(dir.path(), &private_pem, "example.com", None, None).unwrap();

    let resolver = TrustBundleResolver::new(TrustBundle::new());
    let result = verify_skill_with_resolver(dir.path(), "example.com", &resolver, None, None);

    assert_eq!(result.error_code, Some(ErrorCode::DiscoveryFetchFailed));
}

#[test]
fn test_unsigned_directory_fails() {
    let dir = TempDir::new().unwrap();
    make_skill(dir.path());
    let (_key, _private_pem, public_pem) = keypair_pems();

    let result =
        verify_skill_offline(dir.path(), &discovery_for(&public_pem), None, None, None, None);

    assert!(!result.valid);
    assert_eq!(result.error_code, Some(ErrorCode::SignatureInvalid));
}

#[test]
fn test_signer_kid_and_name_overrides() {
    let dir = TempDir::new().unwrap();
    make_skill(dir.path());
    let (key, private_pem, _public_pem) = keypair_pems();

    let envelope = sign_skill(
        dir.path(),
        &private_pem,
        "example.com",
        Some("release-key-2025"),
        Some("scraper-nightly"),
    )
    .unwrap();

    assert_eq!(envelope.signer_kid, "release-key-2025");
    assert_eq!(envelope.skill_name, "scraper-nightly");

    // Without overrides, the kid defaults to the key fingerprint.
    let envelope = sign_skill(dir.path(), &private_pem, "example.com", None, None).unwrap();
    assert_eq!(
        envelope.signer_kid,
        key_fingerprint(key.verifying_key()).unwrap()
    );
}

// =============================================================================
// TAMPER SCENARIOS
// =============================================================================

#[test]
fn test_content_tamper_detected_and_explained() {
    let dir = TempDir::new().unwrap();
    make_skill(dir.path());
    let (_key, private_pem, public_pem) = keypair_pems();
    sign_skill(dir.path(), &private_pem, "example.com", None, None).unwrap();

    // Attacker rewrites the descriptor after signing.
    write_file(dir.path(), "SKILL.md", "# TAMPERED\n");

    let result =
        verify_skill_offline(dir.path(), &discovery_for(&public_pem), None, None, None, None);
    assert!(!result.valid);
    assert_eq!(result.error_code, Some(ErrorCode::SignatureInvalid));

    // The manifest diff names the culprit.
    let envelope = load_signature(dir.path()).unwrap();
    let (_root, current) = canonicalize_skill(dir.path()).unwrap();
    let report = detect_tampered_files(&current, &envelope.file_manifest);
    assert_eq!(report.modified, vec!["SKILL.md"]);
    assert!(report.added.is_empty());
    assert!(report.removed.is_empty());
}

#[test]
fn test_added_and_removed_files_detected() {
    let dir = TempDir::new().unwrap();
    make_skill(dir.path());
    let (_key, private_pem, public_pem) = keypair_pems();
    sign_skill(dir.path(), &private_pem, "example.com", None, None).unwrap();

    write_file(dir.path(), "scripts/backdoor.py", "import os\n");
    fs::remove_file(dir.path().join("data/config.json")).unwrap();

    let result =
        verify_skill_offline(dir.path(), &discovery_for(&public_pem), None, None, None, None);
    assert_eq!(result.error_code, Some(ErrorCode::SignatureInvalid));

    let envelope = load_signature(dir.path()).unwrap();
    let (_root, current) = canonicalize_skill(dir.path()).unwrap();
    let report = detect_tampered_files(&current, &envelope.file_manifest);
    assert_eq!(report.added, vec!["scripts/backdoor.py"]);
    assert_eq!(report.removed, vec!["data/config.json"]);
    assert!(report.modified.is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlink_addition_does_not_break_verification() {
    let dir = TempDir::new().unwrap();
    make_skill(dir.path());
    let (_key, private_pem, public_pem) = keypair_pems();
    sign_skill(dir.path(), &private_pem, "example.com", None, None).unwrap();

    std::os::unix::fs::symlink(dir.path().join("SKILL.md"), dir.path().join("link.md")).unwrap();

    let result =
        verify_skill_offline(dir.path(), &discovery_for(&public_pem), None, None, None, None);
    assert!(result.valid, "{:?}", result);
}

#[test]
fn test_emptied_skill_is_canonicalization_failure() {
    let dir = TempDir::new().unwrap();
    make_skill(dir.path());
    let (_key, private_pem, public_pem) = keypair_pems();
    let envelope = sign_skill(dir.path(), &private_pem, "example.com", None, None).unwrap();

    // Remove every signable file; only the envelope remains.
    for relative in envelope.file_manifest.keys() {
        fs::remove_file(dir.path().join(relative)).unwrap();
    }
    fs::remove_dir_all(dir.path().join("scripts")).unwrap();
    fs::remove_dir_all(dir.path().join("data")).unwrap();

    let result = verify_skill_offline(
        dir.path(),
        &discovery_for(&public_pem),
        Some(envelope),
        None,
        None,
        None,
    );
    assert!(!result.valid);
    assert_eq!(
        result.error_code,
        Some(ErrorCode::SchemaCanonicalizationFailed)
    );
}

// =============================================================================
// SKILL PINNING
// =============================================================================

#[test]
fn test_skill_key_rotation_hits_pin() {
    let dir = TempDir::new().unwrap();
    make_skill(dir.path());
    let pins = MemoryPinStore::new();

    // Sign and verify with key one, establishing the pin.
    let (_key1, private_pem1, public_pem1) = keypair_pems();
    sign_skill(dir.path(), &private_pem1, "example.com", None, None).unwrap();
    let result = verify_skill_offline(
        dir.path(),
        &discovery_for(&public_pem1),
        None,
        None,
        Some(&pins),
        None,
    );
    assert!(result.valid);

    // Re-sign with key two and serve its discovery.
    let (_key2, private_pem2, public_pem2) = keypair_pems();
    sign_skill(dir.path(), &private_pem2, "example.com", None, None).unwrap();
    let result = verify_skill_offline(
        dir.path(),
        &discovery_for(&public_pem2),
        None,
        None,
        Some(&pins),
        None,
    );

    assert!(!result.valid);
    assert_eq!(result.error_code, Some(ErrorCode::KeyPinMismatch));
}

#[test]
fn test_skill_verification_with_durable_pins() {
    let dir = TempDir::new().unwrap();
    make_skill(dir.path());
    let (_key, private_pem, public_pem) = keypair_pems();
    sign_skill(dir.path(), &private_pem, "example.com", None, None).unwrap();

    let pins = DurablePinStore::temporary().unwrap();

    let first = verify_skill_offline(
        dir.path(),
        &discovery_for(&public_pem),
        None,
        None,
        Some(&pins),
        Some("scraper"),
    );
    assert!(first.valid);
    assert_eq!(first.key_pinning.unwrap().status, PinStatus::FirstUse);

    let second = verify_skill_offline(
        dir.path(),
        &discovery_for(&public_pem),
        None,
        None,
        Some(&pins),
        Some("scraper"),
    );
    assert_eq!(second.key_pinning.unwrap().status, PinStatus::Pinned);
}
