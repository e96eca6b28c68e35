//! Testing utilities and mock implementations.
//!
//! This module provides a mock queue store with failure injection and
//! artificial latency, allowing the service and worker error paths to be
//! tested without a real Redis.
//!
//! # Example
//!
//! ```rust,ignore
//! use waitroom_core::testing::{fixtures, MockQueueStore};
//!
//! let store = Arc::new(MockQueueStore::new());
//! let queue = fixtures::queue_service(store.clone());
//!
//! store.set_latency(Duration::from_millis(200)).await;
//! // queue.join(..) now exceeds a short operation deadline
//! ```

mod mock_queue_store;

pub use mock_queue_store::{MockQueueStore, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::admission::AdmissionConfig;
    use crate::queue::{QueueService, QueueSettings, QueueStore};

    /// Queue service with default settings over the given store.
    pub fn queue_service(store: Arc<dyn QueueStore>) -> Arc<QueueService> {
        Arc::new(QueueService::new(store, QueueSettings::default()))
    }

    /// Queue service with a custom per-operation deadline.
    pub fn queue_service_with_timeout(
        store: Arc<dyn QueueStore>,
        operation_timeout: Duration,
    ) -> Arc<QueueService> {
        Arc::new(QueueService::new(
            store,
            QueueSettings {
                operation_timeout,
                ..Default::default()
            },
        ))
    }

    /// Admission config with a short tick, for loop tests.
    pub fn fast_admission(interval_ms: u64) -> AdmissionConfig {
        AdmissionConfig {
            enabled: true,
            interval_ms,
            credential_ttl_secs: 60,
        }
    }

    /// Client identities `prefix1..=prefixN`.
    pub fn clients(prefix: &str, count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("{}{}", prefix, i)).collect()
    }
}
