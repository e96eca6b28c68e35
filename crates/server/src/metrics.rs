//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the waiting-room server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Identities minted for anonymous clients
//! - Queue and admission worker state (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "waitroom_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("waitroom_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "waitroom_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Identities minted for clients that joined without one.
pub static IDENTITIES_MINTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "waitroom_identities_minted_total",
        "Identities minted for anonymous joins",
    )
    .unwrap()
});

// =============================================================================
// Queue Metrics (collected dynamically)
// =============================================================================

/// Clients currently waiting.
pub static QUEUE_WAITING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("waitroom_queue_waiting", "Number of clients currently waiting").unwrap()
});

/// Admission cursor.
pub static QUEUE_NOW_SERVING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("waitroom_queue_now_serving", "Clients admitted so far").unwrap()
});

/// Last issued ticket number.
pub static QUEUE_NEXT_TICKET: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("waitroom_queue_next_ticket", "Last issued ticket number").unwrap()
});

/// Admission rate in effect.
pub static QUEUE_ADMIT_RATE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "waitroom_queue_admit_rate",
        "Clients admitted per tick at the current rate",
    )
    .unwrap()
});

// =============================================================================
// Admission Worker Metrics (collected dynamically)
// =============================================================================

/// Worker running state (1 = running, 0 = stopped).
pub static WORKER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "waitroom_admission_worker_running",
        "Whether the admission worker is running (1) or stopped (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(IDENTITIES_MINTED.clone()))
        .unwrap();

    // Queue
    registry.register(Box::new(QUEUE_WAITING.clone())).unwrap();
    registry
        .register(Box::new(QUEUE_NOW_SERVING.clone()))
        .unwrap();
    registry
        .register(Box::new(QUEUE_NEXT_TICKET.clone()))
        .unwrap();
    registry
        .register(Box::new(QUEUE_ADMIT_RATE.clone()))
        .unwrap();

    // Worker
    registry.register(Box::new(WORKER_RUNNING.clone())).unwrap();

    // Core metrics (queue, store, admission)
    for metric in waitroom_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current values
/// from the store and the admission worker.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    // Update worker metrics
    let status = state.worker().status().await;
    WORKER_RUNNING.set(if status.running { 1 } else { 0 });

    // Update queue metrics; a store failure leaves the previous values
    if let Ok(counters) = state.queue().counters().await {
        QUEUE_WAITING.set(counters.waiting as i64);
        QUEUE_NOW_SERVING.set(counters.now_serving as i64);
        QUEUE_NEXT_TICKET.set(counters.next_ticket as i64);
    }
    QUEUE_ADMIT_RATE.set(state.queue().rate_snapshot().await.rate as i64);
}
