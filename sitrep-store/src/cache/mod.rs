//! Expiring cache tier
//!
//! Fast-path storage for reports, templates and app settings. Entries live
//! under a shared key prefix inside whatever [`KeyValueStore`](crate::kv)
//! substrate the deployment uses, wrapped in a JSON envelope that carries
//! their expiry. Eviction is lazy and reads are self-healing: expired or
//! unreadable entries disappear the first time anything touches them.

mod entry;
mod expiring;
mod key;

pub use entry::CacheEntry;
pub use expiring::ExpiringCache;
pub use key::{KeySpace, ParsedKey};
