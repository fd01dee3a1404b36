//! # Durable Pin Store
//!
//! Sled-backed pin storage that survives restarts. One row per
//! `tool_id`, split across two trees:
//!
//! | Tree | Key | Value | Purpose |
//! |------|-----|-------|---------|
//! | `pins` | tool_id | serialized [`PinnedKey`] | Full record, export/import |
//! | `fingerprints` | tool_id | fingerprint string | TOFU comparison |
//!
//! The fingerprint tree is the serialization point: first-use insertion
//! goes through a compare-and-swap, so two racing `check_and_pin` calls
//! with different fingerprints can never both observe first use — the
//! loser re-reads and gets `pinned` or `changed`. Sled itself is safe
//! for concurrent readers alongside the writer.
//!
//! A stored row whose domain differs from the asserted one reports
//! `changed`: a pin is never silently re-homed to another domain.

use crate::models::{PinError, PinStatus, PinStore, PinnedKey, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, warn};

/// Tree holding full pin records.
const PIN_TREE: &str = "pins";

/// Tree holding fingerprints for TOFU comparison.
const FINGERPRINT_TREE: &str = "fingerprints";

/// A persistent, concurrency-safe pin store.
#[derive(Clone)]
pub struct DurablePinStore {
    db: sled::Db,
    pins: sled::Tree,
    fingerprints: sled::Tree,
}

impl DurablePinStore {
    /// Opens or creates a pin database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`PinError::Database`] if the path is unusable or the
    /// database is corrupted.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let pins = db.open_tree(PIN_TREE)?;
        let fingerprints = db.open_tree(FINGERPRINT_TREE)?;
        Ok(Self {
            db,
            pins,
            fingerprints,
        })
    }

    /// Creates a throwaway in-memory store for tests and embedding.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let pins = db.open_tree(PIN_TREE)?;
        let fingerprints = db.open_tree(FINGERPRINT_TREE)?;
        Ok(Self {
            db,
            pins,
            fingerprints,
        })
    }

    /// Pins a public key for a tool, recording full metadata.
    ///
    /// Returns `true` if the key was pinned, `false` if a pin for this
    /// `tool_id` already exists (the existing pin is left untouched).
    ///
    /// # Errors
    ///
    /// Returns [`PinError::InvalidKey`] if the PEM does not parse as a
    /// P-256 public key.
    pub fn pin_key(
        &self,
        tool_id: &str,
        public_key_pem: &str,
        domain: &str,
        developer_name: Option<&str>,
    ) -> Result<bool> {
        let fingerprint = fingerprint_of(public_key_pem)?;

        let swapped = self.fingerprints.compare_and_swap(
            tool_id.as_bytes(),
            None::<&[u8]>,
            Some(fingerprint.as_bytes()),
        )?;
        if swapped.is_err() {
            debug!("pin for '{}' already exists, not overwriting", tool_id);
            return Ok(false);
        }

        let record = PinnedKey {
            tool_id: tool_id.to_string(),
            public_key_pem: Some(public_key_pem.to_string()),
            domain: domain.to_string(),
            developer_name: developer_name.map(str::to_string),
            pinned_at: Utc::now().to_rfc3339(),
            last_verified: None,
        };
        self.pins
            .insert(tool_id.as_bytes(), serde_json::to_vec(&record)?)?;

        Ok(true)
    }

    /// Returns the pinned public key PEM for a tool, if recorded.
    pub fn get_pinned_key(&self, tool_id: &str) -> Result<Option<String>> {
        Ok(self.get_key_info(tool_id)?.and_then(|r| r.public_key_pem))
    }

    /// Checks whether any pin exists for a tool.
    pub fn is_key_pinned(&self, tool_id: &str) -> Result<bool> {
        Ok(self.fingerprints.contains_key(tool_id.as_bytes())?)
    }

    /// Returns the full pin record for a tool.
    pub fn get_key_info(&self, tool_id: &str) -> Result<Option<PinnedKey>> {
        match self.pins.get(tool_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Stamps the record's `last_verified` with the current time.
    ///
    /// Returns `false` if no pin exists for the tool.
    pub fn update_last_verified(&self, tool_id: &str) -> Result<bool> {
        let mut record = match self.get_key_info(tool_id)? {
            Some(record) => record,
            None => return Ok(false),
        };
        record.last_verified = Some(Utc::now().to_rfc3339());
        self.pins
            .insert(tool_id.as_bytes(), serde_json::to_vec(&record)?)?;
        Ok(true)
    }

    /// Lists all pin records, most recently pinned first.
    pub fn list_pinned_keys(&self) -> Result<Vec<PinnedKey>> {
        let mut records = Vec::new();
        for entry in self.pins.iter() {
            let (_, bytes) = entry?;
            records.push(serde_json::from_slice::<PinnedKey>(&bytes)?);
        }
        records.sort_by(|a, b| b.pinned_at.cmp(&a.pinned_at));
        Ok(records)
    }

    /// Removes the pin for a tool.
    ///
    /// Returns `false` if nothing was pinned. Removal is an explicit
    /// operator action; verification never unpins.
    pub fn remove_pinned_key(&self, tool_id: &str) -> Result<bool> {
        let existed = self.fingerprints.remove(tool_id.as_bytes())?.is_some();
        self.pins.remove(tool_id.as_bytes())?;
        Ok(existed)
    }

    /// Exports all pins as a JSON array of records.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.list_pinned_keys()?)?)
    }

    /// Imports pin records from a JSON array.
    ///
    /// Records without a usable `public_key_pem` are skipped. With
    /// `overwrite` set, existing pins for imported tool ids are replaced;
    /// otherwise they are kept and the import entry is ignored. Returns
    /// the number of records actually pinned, so re-importing the same
    /// export is idempotent.
    pub fn import_json(&self, json: &str, overwrite: bool) -> Result<usize> {
        let records: Vec<PinnedKey> = serde_json::from_str(json)?;
        let mut imported = 0;

        for record in records {
            let pem = match record.public_key_pem.as_deref() {
                Some(pem) => pem,
                None => {
                    warn!("skipping import of '{}': no public key", record.tool_id);
                    continue;
                }
            };

            if overwrite && self.is_key_pinned(&record.tool_id)? {
                self.remove_pinned_key(&record.tool_id)?;
            }

            match self.pin_key(
                &record.tool_id,
                pem,
                &record.domain,
                record.developer_name.as_deref(),
            ) {
                Ok(true) => imported += 1,
                Ok(false) => {}
                Err(PinError::InvalidKey(e)) => {
                    warn!("skipping import of '{}': {}", record.tool_id, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(imported)
    }

    /// Number of pinned tools.
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    /// Returns true if nothing is pinned.
    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Flushes pending writes to disk.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }

    fn stored_fingerprint(&self, tool_id: &str) -> Result<Option<String>> {
        match self.fingerprints.get(tool_id.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| PinError::Corrupt(format!("fingerprint for '{}'", tool_id))),
            None => Ok(None),
        }
    }
}

impl PinStore for DurablePinStore {
    fn check_and_pin(&self, tool_id: &str, domain: &str, fingerprint: &str) -> Result<PinStatus> {
        if self.stored_fingerprint(tool_id)?.is_none() {
            let swapped = self.fingerprints.compare_and_swap(
                tool_id.as_bytes(),
                None::<&[u8]>,
                Some(fingerprint.as_bytes()),
            )?;
            if swapped.is_ok() {
                let record = PinnedKey {
                    tool_id: tool_id.to_string(),
                    public_key_pem: None,
                    domain: domain.to_string(),
                    developer_name: None,
                    pinned_at: Utc::now().to_rfc3339(),
                    last_verified: None,
                };
                self.pins
                    .insert(tool_id.as_bytes(), serde_json::to_vec(&record)?)?;
                return Ok(PinStatus::FirstUse);
            }
            // Lost the race; fall through and compare against the winner.
        }

        let stored = self
            .stored_fingerprint(tool_id)?
            .ok_or_else(|| PinError::Corrupt(format!("pin for '{}' vanished", tool_id)))?;

        if let Some(record) = self.get_key_info(tool_id)? {
            if record.domain != domain {
                warn!(
                    "pin for '{}' belongs to domain '{}', asserted '{}'",
                    tool_id, record.domain, domain
                );
                return Ok(PinStatus::Changed);
            }
        }

        if stored == fingerprint {
            Ok(PinStatus::Pinned)
        } else {
            Ok(PinStatus::Changed)
        }
    }

    fn get_pinned(&self, tool_id: &str, domain: &str) -> Result<Option<String>> {
        if let Some(record) = self.get_key_info(tool_id)? {
            if record.domain != domain {
                return Ok(None);
            }
        }
        self.stored_fingerprint(tool_id)
    }
}

impl std::fmt::Debug for DurablePinStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurablePinStore")
            .field("pinned_tools", &self.len())
            .finish()
    }
}

fn fingerprint_of(public_key_pem: &str) -> Result<String> {
    let key = schemapin_crypto::load_public_key_pem(public_key_pem)
        .map_err(|e| PinError::InvalidKey(e.to_string()))?;
    schemapin_crypto::key_fingerprint(&key).map_err(|e| PinError::InvalidKey(e.to_string()))
}
