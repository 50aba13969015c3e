//! Fuzz test for snapshot parsing and restore
//!
//! Feeds arbitrary byte sequences through the snapshot document parser and,
//! when one parses, through a full restore into a memory-backed store, to
//! find:
//! - Panics or crashes
//! - Infinite loops
//! - Restores that report success while recording failures
//!
//! Run with: cargo +nightly fuzz run snapshot_fuzz -- -max_total_time=60

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use sitrep_core::{SnapshotDocument, StoreConfig};
use sitrep_store::{BackupManager, ExpiringCache, MemoryStore, ReportLog};

fuzz_target!(|data: &[u8]| {
    // Snapshot files arrive as text; skip byte soup that is not UTF-8
    if let Ok(input) = std::str::from_utf8(data) {
        let parsed: Result<SnapshotDocument, _> = serde_json::from_str(input);

        if let Ok(doc) = parsed {
            let kv = Arc::new(MemoryStore::new());
            let config = StoreConfig::default();
            let cache = ExpiringCache::new(Arc::clone(&kv), &config).unwrap();
            let log = ReportLog::new(Arc::clone(&kv), &config).unwrap();
            let manager = BackupManager::new(Arc::clone(&kv), cache, log);

            // Restore is infallible; it absorbs bad entries into the summary
            let summary = manager.restore_snapshot(doc);
            assert_eq!(
                summary.is_clean(),
                summary.failures.is_empty(),
                "clean flag must mirror the failure list"
            );

            // Whatever was restored must export again without panicking
            let _ = manager.export_snapshot();
        }
    }
});
