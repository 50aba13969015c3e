//! Expiring key-value cache
//!
//! TTL-scoped cache over any [`KeyValueStore`] substrate. Expiry is lazy:
//! nothing fires when an entry's lifetime ends, the entry is evicted the
//! next time a read or a sweep touches it. Unreadable entries are treated
//! exactly like expired ones so one corrupt value can never wedge a scan.
//! A payload that decodes but does not match the type the caller asked for
//! is the caller's problem, not the entry's, and is reported without
//! evicting anything.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use sitrep_core::{
    CacheStats, ConfigError, DurationMs, Namespace, SitrepResult, StoreConfig, StoreError,
    CACHE_PREFIX,
};

use crate::cache::entry::CacheEntry;
use crate::cache::key::KeySpace;
use crate::kv::KeyValueStore;

/// TTL cache with lazy eviction over a shared substrate.
pub struct ExpiringCache<S> {
    kv: Arc<S>,
    keys: KeySpace,
    default_ttl_ms: DurationMs,
}

impl<S> Clone for ExpiringCache<S> {
    fn clone(&self) -> Self {
        ExpiringCache {
            kv: Arc::clone(&self.kv),
            keys: self.keys.clone(),
            default_ttl_ms: self.default_ttl_ms,
        }
    }
}

impl<S: KeyValueStore> ExpiringCache<S> {
    /// The cache shares its substrate with the durable tiers, scoped under
    /// [`CACHE_PREFIX`].
    pub fn new(kv: Arc<S>, config: &StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ExpiringCache {
            kv,
            keys: KeySpace::new(CACHE_PREFIX),
            default_ttl_ms: config.default_ttl_ms,
        })
    }

    /// Key layout this cache scopes its entries under.
    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    /// Store a value under the default TTL.
    pub fn set<T: Serialize>(&self, namespace: Namespace, id: &str, data: &T) -> SitrepResult<()> {
        self.set_with_ttl(namespace, id, data, self.default_ttl_ms)
    }

    /// Store a value that expires `ttl_ms` after now.
    pub fn set_with_ttl<T: Serialize>(
        &self,
        namespace: Namespace,
        id: &str,
        data: &T,
        ttl_ms: DurationMs,
    ) -> SitrepResult<()> {
        if ttl_ms <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "ttl_ms".to_string(),
                value: ttl_ms.to_string(),
                reason: "TTL must be positive".to_string(),
            }
            .into());
        }
        let data = serde_json::to_value(data).map_err(serialization_error)?;
        let entry = CacheEntry::new(data, namespace, Utc::now(), ttl_ms);
        let raw = entry.encode().map_err(serialization_error)?;
        self.kv.set(&self.keys.entry_key(namespace, id), &raw)
    }

    /// Read a live entry. Expired and unreadable entries are evicted on the
    /// spot and read as absent. A live entry whose payload does not match
    /// `T` is left in place and reported as a serialization fault.
    pub fn get<T: DeserializeOwned>(
        &self,
        namespace: Namespace,
        id: &str,
    ) -> SitrepResult<Option<T>> {
        let key = self.keys.entry_key(namespace, id);
        let Some(raw) = self.kv.get(&key)? else {
            return Ok(None);
        };
        let entry = match CacheEntry::decode(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "evicting unreadable cache entry");
                self.kv.remove(&key)?;
                return Ok(None);
            }
        };
        if entry.is_expired_at(Utc::now()) {
            debug!(key = %key, "evicting expired cache entry");
            self.kv.remove(&key)?;
            return Ok(None);
        }
        let data = entry.into_data().map_err(serialization_error)?;
        Ok(Some(data))
    }

    /// Drop one entry. Returns whether it was present. Absent entries are
    /// not an error.
    pub fn remove(&self, namespace: Namespace, id: &str) -> SitrepResult<bool> {
        self.kv.remove(&self.keys.entry_key(namespace, id))
    }

    /// Every live payload of one namespace. Expired and unreadable entries
    /// are evicted along the way; payloads that do not match `T` are skipped
    /// so a single odd value cannot abort the scan.
    pub fn get_all<T: DeserializeOwned>(&self, namespace: Namespace) -> SitrepResult<Vec<T>> {
        let now = Utc::now();
        let mut out = Vec::new();
        for key in self.kv.list_keys(&self.keys.namespace_prefix(namespace))? {
            let Some(raw) = self.kv.get(&key)? else {
                continue;
            };
            let entry = match CacheEntry::decode(&raw) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(key = %key, error = %e, "evicting unreadable cache entry");
                    self.kv.remove(&key)?;
                    continue;
                }
            };
            if entry.is_expired_at(now) {
                debug!(key = %key, "evicting expired cache entry");
                self.kv.remove(&key)?;
                continue;
            }
            match entry.into_data() {
                Ok(data) => out.push(data),
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping cache entry with mismatched payload");
                }
            }
        }
        Ok(out)
    }

    /// Sweep the whole cache, across every namespace, evicting expired and
    /// unreadable entries. Returns how many were dropped.
    pub fn clean_expired(&self) -> SitrepResult<u64> {
        let now = Utc::now();
        let mut evicted = 0;
        for key in self.kv.list_keys(self.keys.prefix())? {
            let Some(raw) = self.kv.get(&key)? else {
                continue;
            };
            let expired = match CacheEntry::decode(&raw) {
                Ok(entry) => entry.is_expired_at(now),
                // Unreadable counts as expired.
                Err(e) => {
                    warn!(key = %key, error = %e, "treating unreadable cache entry as expired");
                    true
                }
            };
            if expired && self.kv.remove(&key)? {
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(evicted, "cache sweep complete");
        }
        Ok(evicted)
    }

    /// Drop every entry of every namespace, live or not. Keys outside the
    /// cache prefix are untouched.
    pub fn clear_all(&self) -> SitrepResult<u64> {
        let mut removed = 0;
        for key in self.kv.list_keys(self.keys.prefix())? {
            if self.kv.remove(&key)? {
                removed += 1;
            }
        }
        debug!(removed, "cache cleared");
        Ok(removed)
    }

    /// Occupancy counts. Namespace tokens come from the key names, so alien
    /// tokens written by a raw import still show up; expiry comes from the
    /// envelopes, with unreadable entries counted as expired. Never mutates.
    pub fn stats(&self) -> SitrepResult<CacheStats> {
        let now = Utc::now();
        let mut stats = CacheStats::default();
        for key in self.kv.list_keys(self.keys.prefix())? {
            stats.total += 1;
            if let Some(parsed) = self.keys.parse(&key) {
                *stats.by_type.entry(parsed.token.to_string()).or_insert(0) += 1;
            }
            let Some(raw) = self.kv.get(&key)? else {
                continue;
            };
            let expired = match CacheEntry::decode(&raw) {
                Ok(entry) => entry.is_expired_at(now),
                Err(_) => true,
            };
            if expired {
                stats.expired += 1;
            }
        }
        Ok(stats)
    }
}

fn serialization_error(e: serde_json::Error) -> sitrep_core::SitrepError {
    StoreError::Serialization {
        reason: e.to_string(),
    }
    .into()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use serde_json::{json, Value};
    use sitrep_core::SitrepError;

    fn make_test_cache() -> (ExpiringCache<MemoryStore>, Arc<MemoryStore>) {
        let kv = Arc::new(MemoryStore::new());
        let cache = ExpiringCache::new(Arc::clone(&kv), &StoreConfig::default()).unwrap();
        (cache, kv)
    }

    /// Write an envelope with a chosen expiry straight into the substrate.
    fn inject_entry(
        kv: &MemoryStore,
        namespace: Namespace,
        id: &str,
        data: Value,
        expiry_ms: i64,
    ) {
        let keys = KeySpace::new(CACHE_PREFIX);
        let entry = CacheEntry {
            data,
            timestamp: 0,
            expiry: expiry_ms,
            entry_type: namespace.token().to_string(),
        };
        kv.set(&keys.entry_key(namespace, id), &entry.encode().unwrap())
            .unwrap();
    }

    #[test]
    fn test_set_get_round_trip() {
        let (cache, _kv) = make_test_cache();
        cache
            .set(Namespace::Template, "harian", &json!({"judul": "Laporan Harian"}))
            .unwrap();
        let got: Option<Value> = cache.get(Namespace::Template, "harian").unwrap();
        assert_eq!(got, Some(json!({"judul": "Laporan Harian"})));
    }

    #[test]
    fn test_get_absent_is_none() {
        let (cache, _kv) = make_test_cache();
        let got: Option<Value> = cache.get(Namespace::Report, "nothing").unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_default_ttl_lands_in_envelope() {
        let (cache, kv) = make_test_cache();
        cache.set(Namespace::Report, "r1", &json!(1)).unwrap();
        let keys = KeySpace::new(CACHE_PREFIX);
        let raw = kv.get(&keys.entry_key(Namespace::Report, "r1")).unwrap().unwrap();
        let entry = CacheEntry::decode(&raw).unwrap();
        assert_eq!(entry.expiry - entry.timestamp, StoreConfig::default().default_ttl_ms);
        assert_eq!(entry.entry_type, "laporan");
    }

    #[test]
    fn test_expired_entry_reads_absent_and_is_evicted() {
        let (cache, kv) = make_test_cache();
        inject_entry(&kv, Namespace::Report, "old", json!("stale"), 1);
        let got: Option<Value> = cache.get(Namespace::Report, "old").unwrap();
        assert!(got.is_none());
        assert_eq!(kv.len().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_entry_reads_absent_and_is_evicted() {
        let (cache, kv) = make_test_cache();
        let keys = KeySpace::new(CACHE_PREFIX);
        kv.set(&keys.entry_key(Namespace::Report, "bad"), "{broken")
            .unwrap();
        let got: Option<Value> = cache.get(Namespace::Report, "bad").unwrap();
        assert!(got.is_none());
        assert_eq!(kv.len().unwrap(), 0);
    }

    #[test]
    fn test_mismatched_payload_errors_without_eviction() {
        let (cache, _kv) = make_test_cache();
        cache.set(Namespace::Report, "r1", &json!("not a list")).unwrap();
        let got: SitrepResult<Option<Vec<u32>>> = cache.get(Namespace::Report, "r1");
        assert!(matches!(
            got,
            Err(SitrepError::Store(StoreError::Serialization { .. }))
        ));
        // The entry survives for a caller that asks for the right type.
        let intact: Option<Value> = cache.get(Namespace::Report, "r1").unwrap();
        assert_eq!(intact, Some(json!("not a list")));
    }

    #[test]
    fn test_set_with_nonpositive_ttl_is_rejected() {
        let (cache, kv) = make_test_cache();
        let err = cache
            .set_with_ttl(Namespace::Report, "r1", &json!(1), 0)
            .unwrap_err();
        assert!(matches!(err, SitrepError::Config(_)));
        assert_eq!(kv.len().unwrap(), 0);
    }

    #[test]
    fn test_huge_ttl_entry_stays_readable() {
        // A lifetime near the integer limit pins the expiry to the far
        // future; it must never wrap into the past.
        let kv = Arc::new(MemoryStore::new());
        let config = StoreConfig::default().with_default_ttl_ms(i64::MAX);
        let cache = ExpiringCache::new(Arc::clone(&kv), &config).unwrap();

        cache.set(Namespace::Report, "r1", &json!({"id": "r1"})).unwrap();
        let got: Option<Value> = cache.get(Namespace::Report, "r1").unwrap();
        assert_eq!(got, Some(json!({"id": "r1"})));

        cache
            .set_with_ttl(Namespace::Template, "t1", &json!(1), i64::MAX)
            .unwrap();
        let stats = cache.stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.expired, 0);
    }

    #[test]
    fn test_get_all_returns_live_entries_and_evicts_the_rest() {
        let (cache, kv) = make_test_cache();
        cache.set(Namespace::Report, "fresh", &json!({"id": "fresh"})).unwrap();
        inject_entry(&kv, Namespace::Report, "stale", json!({"id": "stale"}), 1);
        let keys = KeySpace::new(CACHE_PREFIX);
        kv.set(&keys.entry_key(Namespace::Report, "bad"), "garbage").unwrap();
        cache.set(Namespace::Template, "other", &json!("elsewhere")).unwrap();

        let all: Vec<Value> = cache.get_all(Namespace::Report).unwrap();
        assert_eq!(all, vec![json!({"id": "fresh"})]);
        // Stale and corrupt are gone, the other namespace is untouched.
        assert_eq!(kv.len().unwrap(), 2);
    }

    #[test]
    fn test_get_all_skips_mismatched_payloads() {
        let (cache, _kv) = make_test_cache();
        cache.set(Namespace::Report, "a", &json!({"n": 1})).unwrap();
        cache.set(Namespace::Report, "b", &json!("just a string")).unwrap();

        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Doc {
            n: u32,
        }
        let docs: Vec<Doc> = cache.get_all(Namespace::Report).unwrap();
        assert_eq!(docs, vec![Doc { n: 1 }]);
    }

    #[test]
    fn test_clean_expired_spans_namespaces() {
        let (cache, kv) = make_test_cache();
        cache.set(Namespace::Report, "live", &json!(1)).unwrap();
        inject_entry(&kv, Namespace::Report, "dead", json!(2), 1);
        inject_entry(&kv, Namespace::Template, "dead-too", json!(3), 1);
        let keys = KeySpace::new(CACHE_PREFIX);
        kv.set(&keys.entry_key(Namespace::Settings, "bad"), "###").unwrap();

        assert_eq!(cache.clean_expired().unwrap(), 3);
        assert_eq!(kv.len().unwrap(), 1);
        // Second sweep finds nothing left to do.
        assert_eq!(cache.clean_expired().unwrap(), 0);
    }

    #[test]
    fn test_clear_all_leaves_foreign_keys_alone() {
        let (cache, kv) = make_test_cache();
        cache.set(Namespace::Report, "a", &json!(1)).unwrap();
        cache.set(Namespace::Template, "b", &json!(2)).unwrap();
        kv.set("koramil_data_v3", "[]").unwrap();

        assert_eq!(cache.clear_all().unwrap(), 2);
        assert_eq!(kv.get("koramil_data_v3").unwrap().as_deref(), Some("[]"));
        assert_eq!(kv.len().unwrap(), 1);
    }

    #[test]
    fn test_stats_counts_types_and_expiry_without_mutating() {
        let (cache, kv) = make_test_cache();
        cache.set(Namespace::Report, "live", &json!(1)).unwrap();
        inject_entry(&kv, Namespace::Report, "dead", json!(2), 1);
        cache.set(Namespace::Template, "tmpl", &json!(3)).unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_type.get("laporan"), Some(&2));
        assert_eq!(stats.by_type.get("template"), Some(&1));
        assert_eq!(stats.expired, 1);
        // Reading stats never evicts.
        assert_eq!(kv.len().unwrap(), 3);
    }

    #[test]
    fn test_stats_counts_alien_tokens_from_raw_import() {
        let (cache, kv) = make_test_cache();
        kv.set("koramil_cache_backup_x", "{not even json").unwrap();
        let stats = cache.stats().unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.by_type.get("backup"), Some(&1));
        assert_eq!(stats.expired, 1);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::kv::MemoryStore;
    use proptest::prelude::*;
    use serde_json::json;

    fn entry_strategy() -> impl Strategy<Value = (String, bool, bool)> {
        // (id, expired, corrupt)
        ("[a-z0-9]{1,12}", any::<bool>(), any::<bool>())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// After a sweep, stats report zero expired entries and the live
        /// ones are all still readable.
        #[test]
        fn prop_sweep_leaves_only_live_entries(entries in proptest::collection::vec(entry_strategy(), 0..20)) {
            let kv = Arc::new(MemoryStore::new());
            let cache = ExpiringCache::new(Arc::clone(&kv), &StoreConfig::default()).unwrap();
            let keys = KeySpace::new(CACHE_PREFIX);

            let mut live = std::collections::BTreeSet::new();
            for (id, expired, corrupt) in &entries {
                let key = keys.entry_key(Namespace::Report, id);
                if *corrupt {
                    kv.set(&key, "{broken").unwrap();
                    live.remove(id);
                } else if *expired {
                    let entry = CacheEntry {
                        data: json!(1),
                        timestamp: 0,
                        expiry: 1,
                        entry_type: "laporan".to_string(),
                    };
                    kv.set(&key, &entry.encode().unwrap()).unwrap();
                    live.remove(id);
                } else {
                    cache.set(Namespace::Report, id, &json!({"id": id})).unwrap();
                    live.insert(id.clone());
                }
            }

            cache.clean_expired().unwrap();
            let stats = cache.stats().unwrap();
            prop_assert_eq!(stats.expired, 0);
            prop_assert_eq!(stats.total, live.len() as u64);
            for id in &live {
                let got: Option<serde_json::Value> = cache.get(Namespace::Report, id).unwrap();
                prop_assert!(got.is_some());
            }
        }
    }
}
