//! Waiting-room queue: ticket issuance, position estimation and the store
//! contract behind them.

mod error;
pub mod estimator;
mod keys;
mod memory_store;
mod redis_store;
mod service;
mod store;
mod types;

use std::sync::Arc;

pub use error::{QueueError, StoreError};
pub use estimator::{eta_seconds, RateSnapshot, RateSource};
pub use keys::QueueKeys;
pub use memory_store::MemoryQueueStore;
pub use redis_store::RedisQueueStore;
pub use service::{QueueService, QueueSettings};
pub use store::QueueStore;
pub use types::{
    AdmissionCredential, AdmitReport, AdmittedStatus, ClientId, JoinState, JoinStatus,
    PromotionResult, QueueCounters, QueueStatus, StatusOutcome, Ticket, WaitEntry,
    MAX_CLIENT_ID_LEN,
};

use crate::config::{StoreBackend, StoreConfig};

/// Factory function to create the configured store backend.
pub async fn create_queue_store(
    config: &StoreConfig,
    keys: QueueKeys,
) -> Result<Arc<dyn QueueStore>, StoreError> {
    match config.backend {
        StoreBackend::Redis => {
            let store = RedisQueueStore::new(&config.redis_url, keys).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryQueueStore::new())),
    }
}
