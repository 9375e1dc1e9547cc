// src/system/memory.rs
//
// The two memory collaborators: a process-lifetime session store and a
// JSON-file-backed store that survives restarts.

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::constants::STATE_FILENAME;
use crate::context::{PersistentMemory, SessionMemory};

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Keyed session memory. Entries are independent, so concurrent sibling
/// invocations only contend on the map lock itself.
#[derive(Debug, Default)]
pub struct SessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStore {
    pub fn get(&self, key: &str) -> Option<String> {
        locked(&self.entries).get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        locked(&self.entries).insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        locked(&self.entries).remove(key);
    }
}

impl SessionMemory for SessionStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::get(self, key)
    }

    fn set(&self, key: &str, value: &str) {
        Self::set(self, key, value);
    }

    fn remove(&self, key: &str) {
        Self::remove(self, key);
    }
}

/// Persistent memory backed by one JSON object on disk. The whole file is
/// read once on open and rewritten on every set; remembered selections are
/// small and writes are rare (one per completed human selection).
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<serde_json::Map<String, Value>>,
}

impl JsonFileStore {
    /// Opens (or lazily creates) the store at `path`. An unreadable or
    /// corrupt file logs a warning and starts empty rather than failing
    /// the invocation.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    log::warn!(
                        "State file '{}' is not a JSON object, starting empty.",
                        path.display()
                    );
                    serde_json::Map::new()
                }
            },
            Err(_) => serde_json::Map::new(),
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// The default state location: `<config dir>/shellpick/state.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellpick")
            .join(STATE_FILENAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &serde_json::Map<String, Value>) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                log::warn!("Could not create '{}': {err}", parent.display());
                return;
            }
        }
        let payload = match serde_json::to_string_pretty(&Value::Object(entries.clone())) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("Could not serialize state: {err}");
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.path, payload) {
            log::warn!("Could not write '{}': {err}", self.path.display());
        }
    }
}

impl PersistentMemory for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        locked(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut entries = locked(&self.entries);
        entries.insert(key.to_string(), value);
        self.flush(&entries);
    }
}
