//! Key-value persistence used by the repository registry and report cache.
//!
//! The rest of the crate only sees [`KeyValueStore`]; whether entries live in
//! memory or in a JSON file on disk is decided once in [`crate::state`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// String key-value store with optional per-entry expiry.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value for `key`, or `None` if missing or expired.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, overwriting any previous entry. With a
    /// `ttl` the entry stops being visible once it elapses.
    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;

    /// Live keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValue {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        // A TTL too large to represent means the entry never expires
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|d| Utc::now().checked_add_signed(d));
        Self { value, expires_at }
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |t| now < t)
    }
}

fn live_keys(entries: &HashMap<String, StoredValue>, prefix: &str) -> Vec<String> {
    let now = Utc::now();
    let mut keys: Vec<String> = entries
        .iter()
        .filter(|(k, v)| k.starts_with(prefix) && v.is_live(now))
        .map(|(k, _)| k.clone())
        .collect();
    keys.sort();
    keys
}

/// In-process store; contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|v| v.is_live(Utc::now()))
            .map(|v| v.value.clone())
    }

    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), StoredValue::new(value, ttl));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Vec<String> {
        live_keys(&self.entries.read(), prefix)
    }
}

/// Store backed by a single JSON file, rewritten on every mutation.
///
/// Writes go through a temp file + rename so a crash never leaves a
/// half-written file behind. Concurrent writers to the same key are not
/// coordinated: last write wins.
pub struct JsonFileStore {
    entries: RwLock<HashMap<String, StoredValue>>,
    path: PathBuf,
}

impl JsonFileStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read store {}", path.display()))?;
            serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::warn!("Store {} is corrupt, starting empty: {e}", path.display());
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        Ok(Self {
            entries: RwLock::new(entries),
            path: path.to_path_buf(),
        })
    }

    fn persist(&self, entries: &HashMap<String, StoredValue>) -> Result<()> {
        let data = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|v| v.is_live(Utc::now()))
            .map(|v| v.value.clone())
    }

    fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), StoredValue::new(value, ttl));
        // Expired entries are dropped opportunistically on write
        let now = Utc::now();
        entries.retain(|_, v| v.is_live(now));
        self.persist(&entries)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Vec<String> {
        live_keys(&self.entries.read(), prefix)
    }
}
