//! Report service facade
//!
//! Ties the tiers together behind the operations the UI layer calls: save,
//! list, delete, templates, settings, status. A save writes the cache and
//! the durable log synchronously, then awaits the remote push; the push
//! outcome is part of the receipt but never gates local persistence. The
//! save as a whole fails only when every tier, remote included, rejected
//! the report.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use sitrep_core::{
    ApiConfig, ConfigError, Namespace, Report, SitrepResult, StoreConfig, StoreError,
    SystemStatus, APP_SETTINGS_ID, CONFIG_KEY,
};
use sitrep_store::{merge_tiers, ExpiringCache, KeyValueStore, ReportLog};

use crate::remote::{PushOutcome, RemoteFetch, RemoteSource};

// ============================================================================
// RECEIPT AND FILTER
// ============================================================================

/// Per-tier outcome of one save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReceipt {
    /// Cache tier accepted the report.
    pub cache: bool,
    /// Durable log accepted the report.
    pub log: bool,
    /// Remote push outcome.
    pub remote: PushOutcome,
}

impl SaveReceipt {
    /// True when the report survives a restart of this device. A receipt
    /// with only `remote` sent means "synced but not stored locally".
    pub fn stored_locally(&self) -> bool {
        self.cache || self.log
    }
}

/// Optional list filter: a report year and a free-text needle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub year: Option<i32>,
    pub text: Option<String>,
}

impl ReportFilter {
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Year matches on the `tanggal` prefix; the needle matches
    /// case-insensitively anywhere in the serialized record, so narrative
    /// text, activities and remarks are all searchable.
    pub fn matches(&self, report: &Report) -> bool {
        if let Some(year) = self.year {
            if !report.tanggal.starts_with(&format!("{year:04}")) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            if !needle.is_empty() {
                let haystack = match serde_json::to_string(report) {
                    Ok(raw) => raw.to_lowercase(),
                    Err(_) => return false,
                };
                if !haystack.contains(&needle) {
                    return false;
                }
            }
        }
        true
    }
}

// ============================================================================
// SERVICE
// ============================================================================

/// Facade over the cache, the durable log and the remote adapter.
pub struct ReportService<S, R> {
    kv: Arc<S>,
    cache: ExpiringCache<S>,
    log: ReportLog<S>,
    remote: R,
}

impl<S: KeyValueStore, R: RemoteSource> ReportService<S, R> {
    pub fn new(kv: Arc<S>, config: &StoreConfig, remote: R) -> Result<Self, ConfigError> {
        let cache = ExpiringCache::new(Arc::clone(&kv), config)?;
        let log = ReportLog::new(Arc::clone(&kv), config)?;
        Ok(ReportService {
            kv,
            cache,
            log,
            remote,
        })
    }

    /// Save one report across all tiers. Local tier failures are logged
    /// and absorbed; the save errors only when no tier at all accepted it.
    pub async fn save_report(&self, report: Report) -> SitrepResult<SaveReceipt> {
        let mut report = report;
        if !report.has_id() {
            report.id = Report::derive_id(&report.tanggal, report.waktu);
        }

        let cached = match self.cache.set(Namespace::Report, &report.id, &report) {
            Ok(()) => true,
            Err(e) => {
                warn!(id = %report.id, error = %e, "cache tier rejected report");
                false
            }
        };
        let logged = match self.log.append(report.clone()) {
            Ok(()) => true,
            Err(e) => {
                warn!(id = %report.id, error = %e, "durable log rejected report");
                false
            }
        };

        let remote = self.remote.push(&report).await;
        if let PushOutcome::Failed(e) = &remote {
            warn!(id = %report.id, error = %e, "remote push failed, report kept locally");
        }

        if !cached && !logged && !remote.is_sent() {
            return Err(StoreError::WriteRejected { id: report.id }.into());
        }
        Ok(SaveReceipt {
            cache: cached,
            log: logged,
            remote,
        })
    }

    /// Merged view over all tiers, newest first. The remote contributes
    /// zero records when unavailable and never fails the call.
    pub async fn list_reports(&self, filter: Option<&ReportFilter>) -> SitrepResult<Vec<Report>> {
        let cached = self.cache.get_all(Namespace::Report)?;
        let durable = self.log.list()?;
        let remote = match self.remote.pull(Namespace::Report).await {
            RemoteFetch::Records(records) => Some(records),
            RemoteFetch::Empty => Some(Vec::new()),
            RemoteFetch::Unavailable => {
                debug!("remote unavailable, merging local tiers only");
                None
            }
        };

        let mut merged = merge_tiers(cached, durable, remote);
        if let Some(filter) = filter {
            merged.retain(|r| filter.matches(r));
        }
        Ok(merged)
    }

    /// Drop a report from both local tiers. Returns whether any tier had
    /// it. The remote copy, if one exists, is out of reach here.
    pub fn delete_report(&self, id: &str) -> SitrepResult<bool> {
        let cached = self.cache.remove(Namespace::Report, id)?;
        let logged = self.log.remove(id)?;
        Ok(cached || logged)
    }

    // ------------------------------------------------------------------
    // Templates and settings
    // ------------------------------------------------------------------

    pub fn save_template(&self, name: &str, template: &Value) -> SitrepResult<()> {
        self.cache.set(Namespace::Template, name, template)
    }

    pub fn template(&self, name: &str) -> SitrepResult<Option<Value>> {
        self.cache.get(Namespace::Template, name)
    }

    pub fn save_settings(&self, settings: &Value) -> SitrepResult<()> {
        self.cache.set(Namespace::Settings, APP_SETTINGS_ID, settings)
    }

    pub fn settings(&self) -> SitrepResult<Option<Value>> {
        self.cache.get(Namespace::Settings, APP_SETTINGS_ID)
    }

    // ------------------------------------------------------------------
    // Status and API configuration
    // ------------------------------------------------------------------

    /// Point-in-time view of all tiers.
    pub fn status(&self) -> SitrepResult<SystemStatus> {
        Ok(SystemStatus {
            cache: self.cache.stats()?,
            stored_reports: self.log.count()?,
            remote_configured: self.load_api_config()?.any_configured(),
        })
    }

    /// Persisted endpoint configuration, falling back to the placeholder
    /// defaults when absent or unreadable.
    pub fn load_api_config(&self) -> SitrepResult<ApiConfig> {
        let Some(raw) = self.kv.get(CONFIG_KEY)? else {
            return Ok(ApiConfig::default());
        };
        match serde_json::from_str(&raw) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(error = %e, "persisted API config unreadable, using defaults");
                Ok(ApiConfig::default())
            }
        }
    }

    pub fn store_api_config(&self, config: &ApiConfig) -> SitrepResult<()> {
        let raw = serde_json::to_string(config).map_err(|e| StoreError::Serialization {
            reason: e.to_string(),
        })?;
        self.kv.set(CONFIG_KEY, &raw)
    }
}

// ============================================================================
// TESTS
// ============================================================================
