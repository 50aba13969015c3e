//! Snapshot and status types
//!
//! Two snapshot layouts circulate in the field: the full backup file written
//! by the settings screen (`BackupFile`) and the leaner state dump used by
//! the in-app restore path (`StateSnapshot`). Import accepts both, so the
//! union type carries an untagged serde representation keyed off the
//! `version` field only `BackupFile` has.

use crate::report::Report;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Internal restore form: records plus the template and settings entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub records: Vec<Report>,
    #[serde(default)]
    pub templates: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: String,
}

/// Full backup file form: durable reports plus the persisted API config and
/// a raw dump of the cache key space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupFile {
    pub version: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub cache: Option<serde_json::Value>,
}

/// Either snapshot form. Variant order matters: `BackupFile` is tried first
/// and only matches when `version` is present; everything else falls through
/// to `StateSnapshot`, whose fields all default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotDocument {
    Backup(BackupFile),
    State(StateSnapshot),
}

/// Cache occupancy counters, computed from key names without touching entry
/// payloads. Unparseable entries count as expired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total: u64,
    pub by_type: BTreeMap<String, u64>,
    pub expired: u64,
}

impl CacheStats {
    /// Entries still alive (total minus expired).
    pub fn fresh(&self) -> u64 {
        self.total.saturating_sub(self.expired)
    }
}

/// Point-in-time view of all tiers for status surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub cache: CacheStats,
    pub stored_reports: usize,
    pub remote_configured: bool,
}

/// Outcome of a snapshot restoration. Per-item failures are collected and
/// reported; they never abort the remaining upserts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoreSummary {
    pub records: usize,
    pub templates: usize,
    pub settings_applied: bool,
    pub raw_entries: usize,
    pub failures: Vec<RestoreFailure>,
}

/// One failed upsert during restoration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreFailure {
    pub key: String,
    pub reason: String,
}

impl RestoreSummary {
    /// True when every item of the snapshot was applied.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
