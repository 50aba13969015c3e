//! Configuration types and storage-format constants
//!
//! `ApiConfig` mirrors the JSON persisted under [`CONFIG_KEY`] by deployed
//! clients, upper-case wire keys included. Freshly installed systems carry
//! placeholder endpoints; every remote code path must treat those as "not
//! configured" rather than attempting I/O against them.

use crate::error::ConfigError;
use crate::DurationMs;
use serde::{Deserialize, Serialize};

// ============================================================================
// STORAGE-FORMAT CONSTANTS
// ============================================================================

/// Global prefix for every cache key in the substrate.
pub const CACHE_PREFIX: &str = "koramil_cache_";

/// Substrate key of the durable report log.
pub const DATA_KEY: &str = "koramil_data_v3";

/// Substrate key of the persisted API configuration.
pub const CONFIG_KEY: &str = "koramil_config_v3";

/// Entry id of the single settings record in the settings namespace.
pub const APP_SETTINGS_ID: &str = "app_settings";

/// Snapshot format version written into backup files.
pub const FORMAT_VERSION: &str = "3.0";

/// Default cache entry lifetime: 24 hours.
pub const DEFAULT_TTL_MS: DurationMs = 24 * 60 * 60 * 1000;

/// Default durable log capacity.
pub const DEFAULT_MAX_REPORTS: usize = 100;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Remote endpoint configuration, persisted under [`CONFIG_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(rename = "WRITE_URL", default)]
    pub write_url: String,
    #[serde(rename = "READ_URL", default)]
    pub read_url: String,
    #[serde(rename = "API_KEY", default)]
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            write_url: "https://script.google.com/macros/s/YOUR_DEPLOYMENT_ID/exec".to_string(),
            read_url: "https://script.google.com/macros/s/YOUR_DEPLOYMENT_ID/exec".to_string(),
            api_key: "YOUR_API_KEY_HERE".to_string(),
        }
    }
}

fn endpoint_configured(value: &str) -> bool {
    !value.is_empty() && !value.contains("YOUR_")
}

impl ApiConfig {
    /// True when the push endpoint points at a real deployment.
    pub fn write_configured(&self) -> bool {
        endpoint_configured(&self.write_url)
    }

    /// True when the pull endpoint points at a real deployment.
    pub fn read_configured(&self) -> bool {
        endpoint_configured(&self.read_url)
    }

    /// True when any remote direction is usable.
    pub fn any_configured(&self) -> bool {
        self.write_configured() || self.read_configured()
    }
}

// ============================================================================
// STORE TUNING
// ============================================================================

/// Tuning knobs for the local tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Default cache entry lifetime in milliseconds.
    pub default_ttl_ms: DurationMs,
    /// Durable log capacity; the oldest reports are evicted beyond it.
    pub max_reports: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            default_ttl_ms: DEFAULT_TTL_MS,
            max_reports: DEFAULT_MAX_REPORTS,
        }
    }
}

impl StoreConfig {
    /// Set the default TTL in milliseconds.
    pub fn with_default_ttl_ms(mut self, ttl_ms: DurationMs) -> Self {
        self.default_ttl_ms = ttl_ms;
        self
    }

    /// Set the durable log capacity.
    pub fn with_max_reports(mut self, max_reports: usize) -> Self {
        self.max_reports = max_reports;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl_ms <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_ttl_ms".to_string(),
                value: self.default_ttl_ms.to_string(),
                reason: "default_ttl_ms must be greater than 0".to_string(),
            });
        }

        if self.max_reports == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_reports".to_string(),
                value: self.max_reports.to_string(),
                reason: "max_reports must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
