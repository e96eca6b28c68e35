//! Position and wait-time estimation.
//!
//! Position is the client's rank in the waiting set (count of waiting entries
//! with a ticket <= its own), so entries pruned out of band never skew it.
//! The wait estimate divides that rank by the admission rate, which is read
//! fresh for every estimate.

use serde::{Deserialize, Serialize};

/// Where an admission rate value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Read from the runtime configuration in the store.
    Configured,
    /// Runtime value missing, unreadable or non-positive; fallback used.
    Fallback,
}

/// Admission rate in effect for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Clients admitted per tick. Always >= 1.
    pub rate: u64,
    pub source: RateSource,
}

impl RateSnapshot {
    /// Resolve a raw stored value against the fallback rate.
    ///
    /// Accepts a positive integer (surrounding whitespace allowed). Anything
    /// else yields the fallback. A fallback of 0 is treated as 1 so the
    /// result can always be used as a divisor.
    pub fn resolve(raw: Option<&str>, fallback: u64) -> Self {
        match raw.and_then(|r| r.trim().parse::<i64>().ok()) {
            Some(rate) if rate > 0 => Self {
                rate: rate as u64,
                source: RateSource::Configured,
            },
            _ => Self::fallback(fallback),
        }
    }

    pub fn fallback(fallback: u64) -> Self {
        Self {
            rate: fallback.max(1),
            source: RateSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == RateSource::Fallback
    }
}

/// Estimated seconds until admission: `position / rate`, floored.
pub fn eta_seconds(position: u64, rate: &RateSnapshot) -> u64 {
    position / rate.rate.max(1)
}
