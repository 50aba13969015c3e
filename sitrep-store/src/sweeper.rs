//! Cache Sweeper Background Task
//!
//! Expiry in the cache is lazy, so entries whose TTL has passed linger in
//! the substrate until something reads them. This module provides a
//! background task that periodically runs a full sweep, evicting every
//! expired or unreadable entry across all namespaces, keeping the substrate
//! from silting up on installations that mostly write.
//!
//! The task runs until its shutdown signal fires and returns the metrics it
//! collected over its lifetime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::cache::ExpiringCache;
use crate::kv::KeyValueStore;

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60 * 60;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the cache sweeper background task.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to run a full sweep (default: hourly)
    pub sweep_interval: Duration,

    /// Whether to log each sweep that evicted something (default: true)
    pub log_evictions: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            log_evictions: true,
        }
    }
}

impl SweeperConfig {
    /// Create a SweeperConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `SITREP_SWEEP_INTERVAL_SECS`: Seconds between sweeps (default: 3600)
    /// - `SITREP_SWEEP_LOG_EVICTIONS`: Whether to log evictions (default: true)
    pub fn from_env() -> Self {
        let sweep_interval = Duration::from_secs(
            std::env::var("SITREP_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        );

        let log_evictions = std::env::var("SITREP_SWEEP_LOG_EVICTIONS")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            sweep_interval,
            log_evictions,
        }
    }

    /// Configuration for development/testing with a short interval.
    pub fn development() -> Self {
        Self {
            sweep_interval: Duration::from_secs(10),
            log_evictions: true,
        }
    }

    /// Configuration for production.
    pub fn production() -> Self {
        Self {
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            log_evictions: true,
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Metrics for sweeper activity.
#[derive(Debug, Default)]
pub struct SweeperMetrics {
    /// Total entries evicted since startup
    pub entries_evicted: AtomicU64,

    /// Total sweep cycles completed
    pub sweep_cycles: AtomicU64,

    /// Total sweep cycles that failed on a substrate fault
    pub sweep_errors: AtomicU64,
}

impl SweeperMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a current snapshot of all counters.
    pub fn snapshot(&self) -> SweeperSnapshot {
        SweeperSnapshot {
            entries_evicted: self.entries_evicted.load(Ordering::Relaxed),
            sweep_cycles: self.sweep_cycles.load(Ordering::Relaxed),
            sweep_errors: self.sweep_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of sweeper metrics at a point in time.
#[derive(Debug, Clone)]
pub struct SweeperSnapshot {
    pub entries_evicted: u64,
    pub sweep_cycles: u64,
    pub sweep_errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Background task that periodically sweeps the expiring cache.
///
/// Runs until the shutdown signal flips to `true` or its sender is dropped,
/// then returns the metrics collected over its lifetime.
///
/// # Example
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = tokio::spawn(sweeper_task(cache.clone(), SweeperConfig::default(), shutdown_rx));
///
/// // Later, trigger shutdown and collect the counters.
/// let _ = shutdown_tx.send(true);
/// let metrics = handle.await?;
/// ```
pub async fn sweeper_task<S: KeyValueStore>(
    cache: ExpiringCache<S>,
    config: SweeperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<SweeperMetrics> {
    let metrics = Arc::new(SweeperMetrics::new());

    let mut sweep_interval = interval(config.sweep_interval);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "Cache sweeper started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // A dropped sender means nobody can signal us anymore.
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Cache sweeper shutting down");
                    break;
                }
            }

            _ = sweep_interval.tick() => {
                run_sweep(&cache, &config, &metrics);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        entries_evicted = snapshot.entries_evicted,
        sweep_cycles = snapshot.sweep_cycles,
        sweep_errors = snapshot.sweep_errors,
        "Cache sweeper completed"
    );

    metrics
}

/// Perform one sweep cycle.
fn run_sweep<S: KeyValueStore>(
    cache: &ExpiringCache<S>,
    config: &SweeperConfig,
    metrics: &SweeperMetrics,
) {
    metrics.sweep_cycles.fetch_add(1, Ordering::Relaxed);

    match cache.clean_expired() {
        Ok(evicted) => {
            if evicted > 0 {
                metrics.entries_evicted.fetch_add(evicted, Ordering::Relaxed);
                if config.log_evictions {
                    tracing::info!(evicted, "Sweep cycle evicted expired cache entries");
                }
            } else {
                tracing::trace!("Sweep cycle found nothing expired");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Sweep cycle failed");
            metrics.sweep_errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use crate::kv::MemoryStore;
    use sitrep_core::{Namespace, StoreConfig, CACHE_PREFIX};

    #[test]
    fn test_config_default() {
        let config = SweeperConfig::default();
        assert_eq!(
            config.sweep_interval,
            Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)
        );
        assert!(config.log_evictions);
    }

    #[test]
    fn test_config_development() {
        let config = SweeperConfig::development();
        assert_eq!(config.sweep_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_config_production() {
        let config = SweeperConfig::production();
        assert_eq!(
            config.sweep_interval,
            Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)
        );
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = SweeperMetrics::new();
        metrics.entries_evicted.store(4, Ordering::Relaxed);
        metrics.sweep_cycles.store(2, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.entries_evicted, 4);
        assert_eq!(snapshot.sweep_cycles, 2);
        assert_eq!(snapshot.sweep_errors, 0);
    }

    #[tokio::test]
    async fn test_sweeper_evicts_and_shuts_down() {
        let kv = Arc::new(MemoryStore::new());
        let cache = ExpiringCache::new(Arc::clone(&kv), &StoreConfig::default()).unwrap();

        // One live entry and one long expired.
        cache
            .set(Namespace::Report, "live", &serde_json::json!(1))
            .unwrap();
        let stale = CacheEntry {
            data: serde_json::json!(2),
            timestamp: 0,
            expiry: 1,
            entry_type: "laporan".to_string(),
        };
        kv.set(
            &format!("{CACHE_PREFIX}laporan_stale"),
            &stale.encode().unwrap(),
        )
        .unwrap();

        let config = SweeperConfig {
            sweep_interval: Duration::from_millis(10),
            log_evictions: false,
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(sweeper_task(cache, config, shutdown_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        let metrics = handle.await.unwrap();

        let snapshot = metrics.snapshot();
        assert!(snapshot.sweep_cycles >= 1);
        assert_eq!(snapshot.entries_evicted, 1);
        assert_eq!(snapshot.sweep_errors, 0);
        assert_eq!(kv.len().unwrap(), 1);
    }
}
