//! LMDB-backed substrate
//!
//! Persistent [`KeyValueStore`] over a memory-mapped LMDB environment via
//! the heed crate. One unnamed database holds every key; reads run in read
//! transactions, writes commit their own write transaction, so a failed
//! write leaves the previous value in place. A full map reports as
//! `QuotaExceeded`, the same taxonomy the in-memory store uses for its byte
//! quota.

use std::path::Path;

use heed::types::Str;
use heed::{Database, Env, EnvOpenOptions};
use sitrep_core::{SitrepError, SitrepResult, StoreError};

use crate::kv::KeyValueStore;

/// Error type for LMDB substrate operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for SitrepError {
    fn from(e: LmdbStoreError) -> Self {
        SitrepError::Store(StoreError::Backend {
            reason: e.to_string(),
        })
    }
}

/// Persistent substrate stored in an LMDB environment on disk.
pub struct LmdbStore {
    env: Env,
    db: Database<Str, Str>,
}

impl LmdbStore {
    /// Open or create the store under `path` with the given map size.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Str, Str> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self { env, db })
    }
}

fn put_error(key: &str, e: heed::Error) -> SitrepError {
    match e {
        heed::Error::Mdb(heed::MdbError::MapFull) => SitrepError::Store(StoreError::QuotaExceeded {
            key: key.to_string(),
        }),
        other => LmdbStoreError::Transaction(other.to_string()).into(),
    }
}

impl KeyValueStore for LmdbStore {
    fn get(&self, key: &str) -> SitrepResult<Option<String>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let value = self
            .db
            .get(&rtxn, key)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(value.map(|v| v.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> SitrepResult<()> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, key, value)
            .map_err(|e| put_error(key, e))?;

        wtxn.commit().map_err(|e| put_error(key, e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> SitrepResult<bool> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, key)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(deleted)
    }

    fn list_keys(&self, prefix: &str) -> SitrepResult<Vec<String>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let mut keys = Vec::new();
        for result in iter {
            match result {
                Ok((key, _)) => {
                    if key.starts_with(prefix) {
                        keys.push(key.to_string());
                    }
                }
                Err(_) => continue,
            }
        }

        Ok(keys)
    }
}

// ============================================================================
// TESTS
// ============================================================================
