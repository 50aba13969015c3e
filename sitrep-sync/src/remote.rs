//! Remote sync contract
//!
//! One-way, best-effort synchronization against the unit's report endpoint.
//! The remote tier is advisory: every outcome is an explicit value handed
//! back to the caller for logging, nothing is thrown past this boundary,
//! and the rest of the system keeps working with a remote that is
//! permanently unreachable or never configured.

use async_trait::async_trait;
use sitrep_core::{Namespace, Report, SyncError};

/// Outcome of a best-effort push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The endpoint accepted the request. The response body is never
    /// inspected.
    Sent,
    /// No usable endpoint is configured; no I/O was attempted.
    NotConfigured,
    /// The attempt failed. Carried for logging, never re-thrown into the
    /// save path.
    Failed(SyncError),
}

impl PushOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, PushOutcome::Sent)
    }
}

/// Result of a best-effort pull.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteFetch {
    /// Endpoint missing, unreachable, or its answer unusable.
    Unavailable,
    /// Well-formed answer carrying no records.
    Empty,
    /// Records fetched from the remote store.
    Records(Vec<Report>),
}

/// Best-effort remote record store.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Best-effort send of one report. Every failure mode comes back as
    /// an outcome value rather than an error.
    async fn push(&self, report: &Report) -> PushOutcome;

    /// Advisory fetch of the remote records of one kind.
    async fn pull(&self, kind: Namespace) -> RemoteFetch;

    /// Connectivity check against the read endpoint, for status surfaces.
    async fn probe(&self) -> Result<(), SyncError>;
}

// ============================================================================
// TESTS
// ============================================================================
