//! File-backed store implementation for persisted session blobs.

use std::collections::HashMap;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use super::SessionStore;

/// [`SessionStore`] keeping one JSON file per key under a root directory.
///
/// Any I/O failure flips the store into a volatile overlay for the rest of
/// its lifetime: subsequent writes land in memory and reads prefer the
/// overlay, so callers never observe an error. The degradation is logged
/// once.
#[derive(Debug)]
pub struct JsonFileStore {
    root: Utf8PathBuf,
    overlay: HashMap<String, String>,
    degraded: bool,
}

impl JsonFileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// Directory creation failure degrades the store immediately rather
    /// than returning an error; session persistence is best-effort.
    #[must_use]
    pub fn open(root: impl Into<Utf8PathBuf>) -> Self {
        let root = root.into();
        let degraded = match fs::create_dir_all(root.as_std_path()) {
            Ok(()) => false,
            Err(error) => {
                log::warn!("session store at {root} unavailable, falling back to memory: {error}");
                true
            }
        };
        Self {
            root,
            overlay: HashMap::new(),
            degraded,
        }
    }

    /// Whether the store has fallen back to volatile storage.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn path_for(&self, key: &str) -> Utf8PathBuf {
        // Keys are dotted identifiers; keep them readable on disk.
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{name}.json"))
    }

    fn degrade(&mut self, path: &Utf8Path, error: &io::Error) {
        if !self.degraded {
            log::warn!("session store write to {path} failed, falling back to memory: {error}");
            self.degraded = true;
        }
    }
}

impl SessionStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.overlay.get(key) {
            return Some(value.clone());
        }
        if self.degraded {
            return None;
        }
        fs::read_to_string(self.path_for(key).as_std_path()).ok()
    }

    fn put(&mut self, key: &str, value: &str) {
        if !self.degraded {
            let path = self.path_for(key);
            if let Err(error) = fs::write(path.as_std_path(), value) {
                self.degrade(&path, &error);
            } else {
                self.overlay.remove(key);
                return;
            }
        }
        self.overlay.insert(key.to_owned(), value.to_owned());
    }

    fn remove(&mut self, key: &str) {
        self.overlay.remove(key);
        if !self.degraded {
            let path = self.path_for(key);
            match fs::remove_file(path.as_std_path()) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => self.degrade(&path, &error),
            }
        }
    }
}
