//! Durable report log
//!
//! Append-oriented report history persisted as one JSON array under
//! [`DATA_KEY`], independent of the expiring cache so reports survive cache
//! sweeps and TTL expiry. The log is capped: once full, the oldest records
//! are dropped first. Every mutation rewrites the array in a single
//! substrate write, so a failed write leaves the previous state intact, and
//! an unreadable array degrades to an empty history instead of an error.

use std::sync::Arc;

use tracing::{debug, warn};

use sitrep_core::{ConfigError, Report, SitrepResult, StoreConfig, StoreError, DATA_KEY};

use crate::kv::KeyValueStore;

/// Capped durable history over a shared substrate.
pub struct ReportLog<S> {
    kv: Arc<S>,
    max_reports: usize,
}

impl<S> Clone for ReportLog<S> {
    fn clone(&self) -> Self {
        ReportLog {
            kv: Arc::clone(&self.kv),
            max_reports: self.max_reports,
        }
    }
}

impl<S: KeyValueStore> ReportLog<S> {
    pub fn new(kv: Arc<S>, config: &StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ReportLog {
            kv,
            max_reports: config.max_reports,
        })
    }

    /// The full history, oldest first. An absent or unreadable array reads
    /// as empty; the next successful write replaces it.
    pub fn list(&self) -> SitrepResult<Vec<Report>> {
        let Some(raw) = self.kv.get(DATA_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(reports) => Ok(reports),
            Err(e) => {
                warn!(error = %e, "report log unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    pub fn count(&self) -> SitrepResult<usize> {
        Ok(self.list()?.len())
    }

    /// Append one report, evicting from the oldest end when the cap is hit.
    pub fn append(&self, report: Report) -> SitrepResult<()> {
        let mut reports = self.list()?;
        reports.push(report);
        self.write(reports)
    }

    /// Drop every record carrying the given id. Returns whether anything
    /// was removed; the substrate is not touched when nothing matched.
    pub fn remove(&self, id: &str) -> SitrepResult<bool> {
        let mut reports = self.list()?;
        let before = reports.len();
        reports.retain(|r| r.id != id);
        if reports.len() == before {
            return Ok(false);
        }
        self.write(reports)?;
        Ok(true)
    }

    fn write(&self, mut reports: Vec<Report>) -> SitrepResult<()> {
        if reports.len() > self.max_reports {
            let overflow = reports.len() - self.max_reports;
            reports.drain(..overflow);
            debug!(evicted = overflow, "report log at capacity, dropping oldest records");
        }
        let raw = serde_json::to_string(&reports).map_err(|e| StoreError::Serialization {
            reason: e.to_string(),
        })?;
        self.kv.set(DATA_KEY, &raw)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use sitrep_core::{ReportPeriod, SitrepError};

    fn make_test_log() -> (ReportLog<MemoryStore>, Arc<MemoryStore>) {
        let kv = Arc::new(MemoryStore::new());
        let log = ReportLog::new(Arc::clone(&kv), &StoreConfig::default()).unwrap();
        (log, kv)
    }

    fn make_report(tanggal: &str, waktu: ReportPeriod) -> Report {
        Report::new(tanggal, waktu, "LAPORAN", Default::default())
    }

    #[test]
    fn test_empty_log_lists_nothing() {
        let (log, _kv) = make_test_log();
        assert!(log.list().unwrap().is_empty());
        assert_eq!(log.count().unwrap(), 0);
    }

    #[test]
    fn test_append_preserves_order() {
        let (log, _kv) = make_test_log();
        log.append(make_report("2024-01-01", ReportPeriod::Dawn)).unwrap();
        log.append(make_report("2024-01-01", ReportPeriod::Dusk)).unwrap();
        log.append(make_report("2024-01-02", ReportPeriod::Dawn)).unwrap();

        let reports = log.list().unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].id, "laporan_2024-01-01_0400");
        assert_eq!(reports[2].id, "laporan_2024-01-02_0400");
    }

    #[test]
    fn test_cap_drops_oldest_first() {
        let kv = Arc::new(MemoryStore::new());
        let config = StoreConfig::default().with_max_reports(3);
        let log = ReportLog::new(Arc::clone(&kv), &config).unwrap();

        for day in 1..=5 {
            log.append(make_report(&format!("2024-01-{day:02}"), ReportPeriod::Dawn))
                .unwrap();
        }
        let reports = log.list().unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].id, "laporan_2024-01-03_0400");
        assert_eq!(reports[2].id, "laporan_2024-01-05_0400");
    }

    #[test]
    fn test_unreadable_array_reads_empty_and_recovers() {
        let (log, kv) = make_test_log();
        kv.set(DATA_KEY, "][ definitely not json").unwrap();
        assert!(log.list().unwrap().is_empty());

        // The next append starts a fresh history.
        log.append(make_report("2024-02-01", ReportPeriod::Dusk)).unwrap();
        let reports = log.list().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, "laporan_2024-02-01_1600");
    }

    #[test]
    fn test_remove_by_id() {
        let (log, _kv) = make_test_log();
        log.append(make_report("2024-01-01", ReportPeriod::Dawn)).unwrap();
        log.append(make_report("2024-01-01", ReportPeriod::Dusk)).unwrap();

        assert!(log.remove("laporan_2024-01-01_0400").unwrap());
        assert!(!log.remove("laporan_2024-01-01_0400").unwrap());
        let reports = log.list().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, "laporan_2024-01-01_1600");
    }

    #[test]
    fn test_failed_write_leaves_previous_state() {
        // Quota sized to fit the first report but not two.
        let kv = Arc::new(MemoryStore::with_quota(700));
        let log = ReportLog::new(Arc::clone(&kv), &StoreConfig::default()).unwrap();

        log.append(make_report("2024-01-01", ReportPeriod::Dawn)).unwrap();
        let before = log.list().unwrap();

        let big = Report::new("2024-01-02", ReportPeriod::Dawn, "x".repeat(2_000), Default::default());
        let err = log.append(big).unwrap_err();
        assert!(matches!(
            err,
            SitrepError::Store(StoreError::QuotaExceeded { .. })
        ));
        assert_eq!(log.list().unwrap(), before);
    }
}
