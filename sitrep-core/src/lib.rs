//! sitrep Core - Shared Data Types
//!
//! Pure data structures shared by every tier of the report persistence
//! layer: the report record, snapshot forms, configuration, and the error
//! taxonomy. No I/O lives here.

pub mod config;
pub mod error;
pub mod report;
pub mod snapshot;

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Duration in milliseconds for TTL values.
pub type DurationMs = i64;

pub use config::{
    ApiConfig, StoreConfig, APP_SETTINGS_ID, CACHE_PREFIX, CONFIG_KEY, DATA_KEY,
    DEFAULT_MAX_REPORTS, DEFAULT_TTL_MS, FORMAT_VERSION,
};
pub use error::{ConfigError, SitrepError, SitrepResult, SnapshotError, StoreError, SyncError};
pub use report::{
    parse_timestamp_or_epoch, ActivitySet, Namespace, OpsReadiness, Report, ReportBody,
    ReportPeriod,
};
pub use snapshot::{
    BackupFile, CacheStats, RestoreFailure, RestoreSummary, SnapshotDocument, StateSnapshot,
    SystemStatus,
};
