//! Session-scoped key/value persistence.
//!
//! All state this engine keeps (taste model, exposure and outcome logs,
//! session metrics) lives in one [`SessionStore`] owned by a single viewer
//! session. Stores hold opaque string blobs under fixed keys; the JSON
//! helpers here absorb corrupt data by returning defaults, so a damaged
//! blob can never fail a ranking or measurement call.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

#[cfg(feature = "store-fs")]
mod fs;

#[cfg(feature = "store-fs")]
pub use fs::JsonFileStore;

/// Fixed keys for each persisted blob, one per logical store.
pub mod keys {
    /// Taste model snapshot.
    pub const TASTE: &str = "gigwise.taste.v1";
    /// Exposure ring buffer.
    pub const EXPOSURES: &str = "gigwise.exposures.v1";
    /// Outcome ring buffer.
    pub const OUTCOMES: &str = "gigwise.outcomes.v1";
    /// Per-day session metrics.
    pub const METRICS: &str = "gigwise.metrics.v1";
}

/// Key/value persistence scoped to one viewer session.
///
/// Implementations must never share state across sessions and must not
/// fail: a backend that loses its medium degrades to volatile storage for
/// the rest of its lifetime.
pub trait SessionStore {
    /// Read the blob stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous blob.
    fn put(&mut self, key: &str, value: &str);

    /// Remove the blob under `key`, if present.
    fn remove(&mut self, key: &str);
}

/// Decode the JSON blob under `key`, or `None` when absent or corrupt.
///
/// Corrupt blobs are logged and treated as missing; the caller substitutes
/// a fresh default.
pub fn read_json<T: DeserializeOwned>(store: &dyn SessionStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            log::warn!("discarding corrupt blob under {key}: {error}");
            None
        }
    }
}

/// Encode `value` as JSON and store it under `key`.
pub fn write_json<T: Serialize>(store: &mut dyn SessionStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.put(key, &raw),
        Err(error) => log::warn!("failed to encode blob for {key}: {error}"),
    }
}

/// Volatile in-memory store.
///
/// Used by tests and as the process-lifetime fallback when a persistent
/// backend becomes unavailable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no blobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}
