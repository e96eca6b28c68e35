//! Types for the admission worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::QueueError;

/// Errors that can occur during an admission pass.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Reading the waiting set or committing the batch failed.
    #[error("admission pass failed: {0}")]
    Queue(#[from] QueueError),
}

/// What started an admission pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionTrigger {
    /// The periodic worker.
    Tick,
    /// An operator request.
    Manual,
}

impl AdmissionTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionTrigger::Tick => "tick",
            AdmissionTrigger::Manual => "manual",
        }
    }
}

/// Current status of the admission worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerStatus {
    /// Whether the periodic loop is running.
    pub running: bool,
    /// Tick interval in milliseconds.
    pub interval_ms: u64,
    /// Admission passes completed (ticks and manual).
    pub passes: u64,
    /// Passes abandoned because the store failed.
    pub failed_passes: u64,
    /// Clients promoted since startup.
    pub promoted_total: u64,
    /// When the last pass finished.
    pub last_pass_at: Option<DateTime<Utc>>,
    /// Error of the last failed pass, cleared by the next success.
    pub last_error: Option<String>,
}
