use std::sync::Arc;
use waitroom_core::{AdmissionWorker, Config, QueueService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    queue: Arc<QueueService>,
    worker: Arc<AdmissionWorker>,
}

impl AppState {
    pub fn new(config: Config, queue: Arc<QueueService>, worker: Arc<AdmissionWorker>) -> Self {
        Self {
            config,
            queue,
            worker,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn event_id(&self) -> &str {
        &self.config.queue.event_id
    }

    pub fn queue(&self) -> &QueueService {
        self.queue.as_ref()
    }

    pub fn worker(&self) -> &AdmissionWorker {
        self.worker.as_ref()
    }
}
