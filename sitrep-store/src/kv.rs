//! Key-value substrate
//!
//! Every local tier persists through this narrow synchronous interface, so
//! tests can swap the backing store for an in-memory double and production
//! can run on LMDB without either side knowing. Values are strings holding
//! serialized JSON; the substrate never interprets them.

use sitrep_core::{SitrepResult, StoreError};
use std::collections::HashMap;
use std::sync::RwLock;

// ============================================================================
// SUBSTRATE TRAIT
// ============================================================================

/// Synchronous string-keyed substrate underneath the local tiers.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> SitrepResult<Option<String>>;

    /// Write `value` under `key`, replacing any previous value. The write
    /// either lands completely or leaves the previous value untouched.
    fn set(&self, key: &str, value: &str) -> SitrepResult<()>;

    /// Delete `key`. Returns whether a value was present.
    fn remove(&self, key: &str) -> SitrepResult<bool>;

    /// List every key starting with `prefix`, in unspecified order. An empty
    /// prefix lists all keys.
    fn list_keys(&self, prefix: &str) -> SitrepResult<Vec<String>>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

struct MemoryInner {
    entries: HashMap<String, String>,
    used_bytes: usize,
}

/// In-memory substrate with an optional byte quota.
///
/// The quota models the hard allotment browsers give origin storage: a `set`
/// that would push key plus value bytes past it fails with `QuotaExceeded`
/// and leaves the previous value in place.
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
    quota_bytes: Option<usize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        MemoryStore {
            inner: RwLock::new(MemoryInner {
                entries: HashMap::new(),
                used_bytes: 0,
            }),
            quota_bytes: None,
        }
    }

    /// Create a store that rejects writes beyond `quota_bytes` of combined
    /// key and value length.
    pub fn with_quota(quota_bytes: usize) -> Self {
        MemoryStore {
            inner: RwLock::new(MemoryInner {
                entries: HashMap::new(),
                used_bytes: 0,
            }),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> SitrepResult<usize> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.entries.len())
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> SitrepResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Combined key and value bytes currently stored.
    pub fn used_bytes(&self) -> SitrepResult<usize> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.used_bytes)
    }
}

fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> SitrepResult<Option<String>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SitrepResult<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        let previous = inner.entries.get(key).map(|v| entry_size(key, v)).unwrap_or(0);
        let next_used = inner.used_bytes - previous + entry_size(key, value);

        if let Some(quota) = self.quota_bytes {
            if next_used > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                }
                .into());
            }
        }

        inner.entries.insert(key.to_string(), value.to_string());
        inner.used_bytes = next_used;
        Ok(())
    }

    fn remove(&self, key: &str) -> SitrepResult<bool> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        match inner.entries.remove(key) {
            Some(value) => {
                inner.used_bytes -= entry_size(key, &value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list_keys(&self, prefix: &str) -> SitrepResult<Vec<String>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================
