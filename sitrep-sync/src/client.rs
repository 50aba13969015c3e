//! HTTP remote client
//!
//! [`RemoteSource`] implementation over the deployed endpoint, a Google
//! Apps Script web app speaking a small JSON protocol. Requests always
//! carry a timeout so a stalled network can never wedge a save, and a
//! placeholder endpoint (the `YOUR_` defaults of a fresh install) is
//! treated as "not configured" before any I/O happens.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use async_trait::async_trait;
use sitrep_core::{ApiConfig, Namespace, Report, SyncError};

use crate::remote::{PushOutcome, RemoteFetch, RemoteSource};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Serialize)]
struct SaveRequest<'a> {
    action: &'static str,
    #[serde(rename = "type")]
    record_type: &'a str,
    data: &'a Report,
    #[serde(rename = "apiKey")]
    api_key: &'a str,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Vec<Report>>,
}

// ============================================================================
// CLIENT
// ============================================================================

/// Remote client over the configured endpoints.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl RemoteClient {
    pub fn new(config: ApiConfig) -> Result<Self, SyncError> {
        Self::with_timeout(config, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(config: ApiConfig, timeout: Duration) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Client {
                reason: e.to_string(),
            })?;
        Ok(RemoteClient { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn transport_error(url: &str, e: reqwest::Error) -> SyncError {
        SyncError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl RemoteSource for RemoteClient {
    async fn push(&self, report: &Report) -> PushOutcome {
        if !self.config.write_configured() {
            debug!("remote push skipped, write endpoint not configured");
            return PushOutcome::NotConfigured;
        }

        let request = SaveRequest {
            action: "save",
            record_type: Namespace::Report.token(),
            data: report,
            api_key: &self.config.api_key,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let response = match self
            .http
            .post(&self.config.write_url)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "remote push failed");
                return PushOutcome::Failed(Self::transport_error(&self.config.write_url, e));
            }
        };

        // The body is never parsed; only the status is checked.
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "remote push rejected");
            return PushOutcome::Failed(SyncError::BadStatus {
                status: status.as_u16(),
            });
        }
        debug!(id = %report.id, "report pushed to remote");
        PushOutcome::Sent
    }

    async fn pull(&self, kind: Namespace) -> RemoteFetch {
        if !self.config.read_configured() {
            debug!("remote pull skipped, read endpoint not configured");
            return RemoteFetch::Unavailable;
        }

        let response = match self
            .http
            .get(&self.config.read_url)
            .query(&[
                ("action", "get"),
                ("type", kind.token()),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "remote pull failed");
                return RemoteFetch::Unavailable;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "remote pull rejected");
            return RemoteFetch::Unavailable;
        }

        let envelope: FetchResponse = match response.json().await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "remote answer unreadable");
                return RemoteFetch::Unavailable;
            }
        };

        if !envelope.success {
            debug!("remote reported no success");
            return RemoteFetch::Unavailable;
        }
        match envelope.data {
            Some(records) if !records.is_empty() => {
                debug!(count = records.len(), "records pulled from remote");
                RemoteFetch::Records(records)
            }
            _ => RemoteFetch::Empty,
        }
    }

    async fn probe(&self) -> Result<(), SyncError> {
        if !self.config.read_configured() {
            return Err(SyncError::NotConfigured);
        }

        let response = self
            .http
            .get(&self.config.read_url)
            .query(&[("action", "test"), ("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Self::transport_error(&self.config.read_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::BadStatus {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
