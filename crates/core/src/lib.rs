pub mod admission;
pub mod config;
pub mod metrics;
pub mod queue;
pub mod testing;

pub use admission::{AdmissionConfig, AdmissionError, AdmissionWorker, WorkerStatus};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    StoreBackend,
};
pub use queue::{
    create_queue_store, ClientId, JoinState, JoinStatus, QueueError, QueueKeys, QueueService,
    QueueSettings, QueueStatus, QueueStore, StatusOutcome, StoreError, Ticket,
};
