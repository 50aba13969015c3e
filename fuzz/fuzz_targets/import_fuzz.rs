//! Fuzz test for the raw namespace import
//!
//! Throws arbitrary byte sequences at `import_raw` to find:
//! - Panics or crashes
//! - Partial writes on malformed input (the import must be atomic)
//!
//! Run with: cargo +nightly fuzz run import_fuzz -- -max_total_time=60

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use sitrep_core::StoreConfig;
use sitrep_store::{BackupManager, ExpiringCache, KeyValueStore, MemoryStore, ReportLog};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let kv = Arc::new(MemoryStore::new());
        let config = StoreConfig::default();
        let cache = ExpiringCache::new(Arc::clone(&kv), &config).unwrap();
        let log = ReportLog::new(Arc::clone(&kv), &config).unwrap();
        let manager = BackupManager::new(Arc::clone(&kv), cache, log);

        match manager.import_raw(input) {
            Ok(written) => {
                let keys = kv.list_keys("").unwrap();
                assert_eq!(keys.len(), written, "import count must match stored keys");
            }
            Err(_) => {
                // Rejected input must leave the store untouched
                assert!(
                    kv.is_empty().unwrap(),
                    "failed import must not write anything"
                );
            }
        }
    }
});
