//! # SchemaPin Pinning - Trust-On-First-Use Key Stores
//!
//! The key fingerprint observed on first successful verification of a
//! `(tool_id, domain)` pair is pinned; any later fingerprint change is
//! reported as `changed` and treated by the verification engine as a
//! hard failure. Pins never change silently — only explicit operator
//! action (remove, overwrite-import) replaces one.
//!
//! Two stores implement the [`PinStore`] contract:
//!
//! - [`MemoryPinStore`] - process-local, JSON round-trippable; for
//!   embedding and tests.
//! - [`DurablePinStore`] - sled-backed, safe for concurrent use, with a
//!   management surface (list, remove, last-verified stamps, JSON
//!   export/import).

pub mod durable;
pub mod memory;
pub mod models;

pub use durable::DurablePinStore;
pub use memory::MemoryPinStore;
pub use models::{PinError, PinStatus, PinStore, PinnedKey, Result};
