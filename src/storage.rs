//! Best-effort persistence for per-slot reading state.
//!
//! The reading view only needs a JSON key-value contract. Failures (quota,
//! disabled storage, unreadable files) are logged and swallowed at the call
//! site; the in-memory state stays authoritative for the running session.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Identifier of one reading slot (a saved text with its own position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
}

/// In-process store. Keeps a log of written keys and can simulate an
/// unavailable backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
    writes: Vec<String>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Keys of every successful write, in order.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        if self.unavailable {
            return Err(anyhow!("memory store unavailable"));
        }
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        if self.unavailable {
            return Err(anyhow!("memory store unavailable"));
        }
        self.values.insert(key.to_string(), value);
        self.writes.push(key.to_string());
        Ok(())
    }
}

/// One JSON file per key under `root`, named by a hash of the key to avoid
/// filesystem issues.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.root.join(format!("{:x}.json", hasher.finalize()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        let value = serde_json::from_str(&data)
            .with_context(|| format!("invalid JSON in {}", path.display()))?;
        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.path_for(key);
        let contents = serde_json::to_string(&value).context("failed to encode value")?;
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Namespaced, per-slot view over a store that never propagates failures.
#[derive(Debug)]
pub struct SlotStorage<K> {
    store: K,
    namespace: String,
}

impl<K: KeyValueStore> SlotStorage<K> {
    pub fn new(store: K, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut K {
        &mut self.store
    }

    pub fn into_store(self) -> K {
        self.store
    }

    pub fn key(&self, kind: &str, slot: SlotId) -> String {
        format!("{}.{kind}.{slot}", self.namespace)
    }

    /// Missing entries, JSON `null`, and failures all read as `None`.
    pub fn read<T: DeserializeOwned>(&self, kind: &str, slot: SlotId) -> Option<T> {
        let key = self.key(kind, slot);
        match self.store.get(&key) {
            Ok(None) | Ok(Some(Value::Null)) => None,
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    warn!(%key, "Ignoring malformed stored value: {err}");
                    None
                }
            },
            Err(err) => {
                warn!(%key, "Storage read failed: {err:#}");
                None
            }
        }
    }

    /// Write `value`, or `null` to clear. Returns whether the write landed.
    pub fn write<T: Serialize>(&mut self, kind: &str, slot: SlotId, value: Option<&T>) -> bool {
        let key = self.key(kind, slot);
        let encoded = match value.map(serde_json::to_value).transpose() {
            Ok(encoded) => encoded.unwrap_or(Value::Null),
            Err(err) => {
                warn!(%key, "Failed to encode value for storage: {err}");
                return false;
            }
        };
        match self.store.set(&key, encoded) {
            Ok(()) => true,
            Err(err) => {
                warn!(%key, "Storage write failed: {err:#}");
                false
            }
        }
    }
}
