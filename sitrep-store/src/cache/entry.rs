//! Cache entry envelope
//!
//! Every cached value is stored as a JSON envelope carrying the payload, the
//! write instant, the absolute expiry instant (both in unix milliseconds) and
//! the namespace token. An entry is expired strictly after its expiry
//! instant, so a TTL of 1000ms written at t=0 still reads at t=1000 and is
//! gone at t=1001.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitrep_core::{DurationMs, Namespace, Timestamp};

/// On-disk envelope around a cached payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    /// Write instant, unix milliseconds.
    pub timestamp: i64,
    /// Absolute expiry instant, unix milliseconds.
    pub expiry: i64,
    #[serde(rename = "type")]
    pub entry_type: String,
}

impl CacheEntry {
    /// Wrap a payload written at `now` with a lifetime of `ttl_ms`. The
    /// expiry instant saturates instead of wrapping, so an oversized
    /// lifetime pins the entry to the far future rather than minting one
    /// that is already expired.
    pub fn new(data: Value, namespace: Namespace, now: Timestamp, ttl_ms: DurationMs) -> Self {
        let written_at = now.timestamp_millis();
        CacheEntry {
            data,
            timestamp: written_at,
            expiry: written_at.saturating_add(ttl_ms),
            entry_type: namespace.token().to_string(),
        }
    }

    /// True strictly after the expiry instant.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now.timestamp_millis() > self.expiry
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a raw substrate value. Failure means the entry is unreadable
    /// and the caller treats it as expired.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Recover the typed payload. Failure here means the envelope was intact
    /// but the payload does not match what the caller asked for.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data)
    }
}

// ============================================================================
// TESTS
// ============================================================================
