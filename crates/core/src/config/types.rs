use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::admission::AdmissionConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub queue: QueueConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Shared store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Redis connection URL (used when backend = "redis")
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Deadline for a single store round-trip
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: default_redis_url(),
            operation_timeout_ms: default_operation_timeout(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_operation_timeout() -> u64 {
    2000
}

/// Available store backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Single-process, non-persistent
    Memory,
}

/// Queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Namespace for all store keys of this queue
    pub event_id: String,
    /// Rate used when the runtime admission rate is missing or invalid
    #[serde(default = "default_fallback_rate")]
    pub fallback_admit_rate: u64,
    /// Admission rate written to the store at startup (keeps the stored
    /// value when unset)
    #[serde(default)]
    pub initial_admit_rate: Option<u64>,
}

fn default_fallback_rate() -> u64 {
    10
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub store: SanitizedStoreConfig,
    pub queue: QueueConfig,
    pub admission: AdmissionConfig,
}

/// Sanitized store config (Redis credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStoreConfig {
    pub backend: String,
    pub redis_url: String,
    pub operation_timeout_ms: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            store: SanitizedStoreConfig {
                backend: match config.store.backend {
                    StoreBackend::Redis => "redis".to_string(),
                    StoreBackend::Memory => "memory".to_string(),
                },
                redis_url: redact_url(&config.store.redis_url),
                operation_timeout_ms: config.store.operation_timeout_ms,
            },
            queue: config.queue.clone(),
            admission: config.admission.clone(),
        }
    }
}

/// Replace the userinfo part of a URL (`user:password@`) with `***@`.
fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}***{}", &url[..scheme_end + 3], &rest[at..]),
        None => url.to_string(),
    }
}
