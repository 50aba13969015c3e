//! Local persistence tiers for situation reports.
//!
//! This crate owns everything that stores report state on the device:
//!
//! - [`kv`]: the string-keyed substrate abstraction plus the in-memory
//!   implementation used in tests and ephemeral deployments
//! - [`lmdb`]: the LMDB-backed substrate for real installations
//! - [`cache`]: the expiring, namespaced cache tier with lazy eviction
//! - [`report_log`]: the capped durable report history
//! - [`merge`]: reconciliation of cache, log and remote record sets
//! - [`backup`]: snapshot export/restore and raw namespace dump/import
//! - [`sweeper`]: the periodic background sweep of expired entries
//!
//! The tiers share one substrate instance and stay independent above it: a
//! cache sweep never touches the durable log, and a full cache wipe leaves
//! report history intact.

pub mod backup;
pub mod cache;
pub mod kv;
pub mod lmdb;
pub mod merge;
pub mod report_log;
pub mod sweeper;

pub use backup::BackupManager;
pub use cache::{CacheEntry, ExpiringCache, KeySpace, ParsedKey};
pub use kv::{KeyValueStore, MemoryStore};
pub use lmdb::{LmdbStore, LmdbStoreError};
pub use merge::merge_tiers;
pub use report_log::ReportLog;
pub use sweeper::{sweeper_task, SweeperConfig, SweeperMetrics, SweeperSnapshot};
