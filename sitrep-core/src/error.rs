//! Error types for sitrep operations

use thiserror::Error;

/// Local storage tier errors (substrate, cache, durable log).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Storage quota exceeded while writing {key}")]
    QuotaExceeded { key: String },

    #[error("Storage backend error: {reason}")]
    Backend { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Report {id} was not accepted by any storage tier")]
    WriteRejected { id: String },
}

/// Snapshot export/import errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {reason}")]
    Malformed { reason: String },

    #[error("Snapshot encoding failed: {reason}")]
    Encode { reason: String },
}

/// Remote synchronization errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Remote endpoint not configured")]
    NotConfigured,

    #[error("HTTP client error: {reason}")]
    Client { reason: String },

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Remote returned status {status}")]
    BadStatus { status: u16 },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all sitrep errors.
#[derive(Debug, Clone, Error)]
pub enum SitrepError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for sitrep operations.
pub type SitrepResult<T> = Result<T, SitrepError>;

// =============================================================================
// TESTS
// =============================================================================
