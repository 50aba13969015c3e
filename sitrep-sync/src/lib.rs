//! # sitrep-sync
//!
//! Remote synchronization and the report service facade.
//!
//! The crate has three pieces:
//!
//! - [`RemoteSource`]: the adapter trait a remote backend implements.
//!   Push reports for an explicit outcome, pull merge candidates, probe
//!   health.
//! - [`RemoteClient`]: the HTTP implementation speaking the Apps Script
//!   wire protocol, with placeholder detection and a mandatory timeout.
//! - [`ReportService`]: the facade the UI layer calls. It owns the cache
//!   and durable log tiers and treats the remote as one more tier that is
//!   allowed to be down.
//!
//! Remote failures never block local persistence. A save fails only when
//! every tier rejected the report.

pub mod client;
pub mod remote;
pub mod service;

pub use client::RemoteClient;
pub use remote::{PushOutcome, RemoteFetch, RemoteSource};
pub use service::{ReportFilter, ReportService, SaveReceipt};
