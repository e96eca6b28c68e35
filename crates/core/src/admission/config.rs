//! Admission worker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the admission worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Enable/disable the periodic worker.
    /// When disabled, clients are only admitted manually via the API.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Tick interval (milliseconds). Fixed at startup.
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Lifetime of an admission credential (seconds).
    #[serde(default = "default_credential_ttl")]
    pub credential_ttl_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    1000 // 1 second
}

fn default_credential_ttl() -> u64 {
    300 // 5 minutes
}

/// Shortest tick interval the worker will run with.
pub const MIN_INTERVAL_MS: u64 = 1;

impl AdmissionConfig {
    /// Tick period, never shorter than [`MIN_INTERVAL_MS`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_INTERVAL_MS))
    }

    pub fn credential_ttl(&self) -> Duration {
        Duration::from_secs(self.credential_ttl_secs)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_ms: default_interval(),
            credential_ttl_secs: default_credential_ttl(),
        }
    }
}
