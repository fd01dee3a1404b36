//! In-memory pin store.
//!
//! State lives for the process only; the JSON round-trip exists for test
//! fixtures and embedded use. Pins are keyed `tool_id@domain`.

use crate::models::{PinStatus, PinStore, Result};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// A process-local, mutex-guarded pin store.
#[derive(Debug, Default)]
pub struct MemoryPinStore {
    pins: Mutex<BTreeMap<String, String>>,
}

fn compose_key(tool_id: &str, domain: &str) -> String {
    format!("{}@{}", tool_id, domain)
}

impl MemoryPinStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes the pin map to JSON (`{"tool@domain": "sha256:..."}`).
    pub fn to_json(&self) -> Result<String> {
        let pins = self.pins.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(serde_json::to_string(&*pins)?)
    }

    /// Restores a store from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        let pins: BTreeMap<String, String> = serde_json::from_str(json)?;
        Ok(Self {
            pins: Mutex::new(pins),
        })
    }

    /// Number of pinned `(tool_id, domain)` pairs.
    pub fn len(&self) -> usize {
        self.pins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is pinned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PinStore for MemoryPinStore {
    fn check_and_pin(&self, tool_id: &str, domain: &str, fingerprint: &str) -> Result<PinStatus> {
        let mut pins = self.pins.lock().unwrap_or_else(PoisonError::into_inner);

        match pins.get(&compose_key(tool_id, domain)) {
            None => {
                pins.insert(compose_key(tool_id, domain), fingerprint.to_string());
                Ok(PinStatus::FirstUse)
            }
            Some(existing) if existing == fingerprint => Ok(PinStatus::Pinned),
            Some(_) => Ok(PinStatus::Changed),
        }
    }

    fn get_pinned(&self, tool_id: &str, domain: &str) -> Result<Option<String>> {
        let pins = self.pins.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(pins.get(&compose_key(tool_id, domain)).cloned())
    }
}
