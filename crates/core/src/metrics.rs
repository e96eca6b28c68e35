//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Queue front door (joins, status queries, rate fallbacks)
//! - Store round-trips (latency, errors, timeouts)
//! - Admission worker (passes, admitted clients)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Queue Metrics
// =============================================================================

/// Join requests total by result.
pub static JOIN_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("waitroom_join_requests_total", "Total queue join requests"),
        &["result"], // "ok", "invalid", "error"
    )
    .unwrap()
});

/// Status queries total by outcome.
pub static STATUS_QUERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("waitroom_status_queries_total", "Total queue status queries"),
        &["outcome"], // "waiting", "admitted", "not_in_queue", "invalid", "error"
    )
    .unwrap()
});

/// Times the fallback admission rate was used.
pub static RATE_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "waitroom_rate_fallbacks_total",
        "Times the fallback admission rate replaced a missing or invalid runtime rate",
    )
    .unwrap()
});

// =============================================================================
// Store Metrics
// =============================================================================

/// Store round-trip duration in seconds.
pub static STORE_OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "waitroom_store_operation_duration_seconds",
            "Duration of shared store round-trips",
        )
        .buckets(vec![
            0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
        ]),
        &["backend", "operation"],
    )
    .unwrap()
});

/// Failed store round-trips.
pub static STORE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("waitroom_store_errors_total", "Total failed store round-trips"),
        &["operation", "kind"], // kind: "error", "timeout"
    )
    .unwrap()
});

// =============================================================================
// Admission Metrics
// =============================================================================

/// Clients admitted total by trigger.
pub static CLIENTS_ADMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("waitroom_clients_admitted_total", "Total clients admitted"),
        &["trigger"], // "tick", "manual"
    )
    .unwrap()
});

/// Admission passes total by trigger and result.
pub static ADMISSION_PASSES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("waitroom_admission_passes_total", "Total admission passes"),
        &["trigger", "result"], // result: "promoted", "idle", "failed"
    )
    .unwrap()
});

/// Admission pass duration in seconds.
pub static ADMISSION_PASS_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "waitroom_admission_pass_duration_seconds",
            "Duration of admission passes",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["trigger"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Queue
        Box::new(JOIN_REQUESTS.clone()),
        Box::new(STATUS_QUERIES.clone()),
        Box::new(RATE_FALLBACKS.clone()),
        // Store
        Box::new(STORE_OPERATION_DURATION.clone()),
        Box::new(STORE_ERRORS.clone()),
        // Admission
        Box::new(CLIENTS_ADMITTED.clone()),
        Box::new(ADMISSION_PASSES.clone()),
        Box::new(ADMISSION_PASS_DURATION.clone()),
    ]
}
