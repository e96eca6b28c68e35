//! Mock queue store for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::queue::{
    AdmissionCredential, ClientId, MemoryQueueStore, PromotionResult, QueueCounters, QueueStore,
    StoreError, Ticket, WaitEntry,
};

/// A recorded store call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Store operation name, e.g. `"issue_ticket"`.
    pub operation: &'static str,
    /// When the call was made.
    pub timestamp: Instant,
}

/// Mock implementation of the QueueStore trait.
///
/// Delegates to a [`MemoryQueueStore`] and adds controllable behavior:
/// - Fail selected operations with a chosen error
/// - Delay every operation (for deadline tests)
/// - Track calls for assertions
///
/// # Example
///
/// ```rust,ignore
/// use waitroom_core::testing::MockQueueStore;
///
/// let store = MockQueueStore::new();
/// store.fail_on("promote", StoreError::Connection("down".into())).await;
///
/// // A promote now fails and leaves the queue untouched
/// assert!(store.promote(&credentials, ttl).await.is_err());
/// assert_eq!(store.call_count("promote").await, 1);
/// ```
#[derive(Debug)]
pub struct MockQueueStore {
    /// Backing state.
    inner: MemoryQueueStore,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    /// Operations that fail, with the error they return.
    failures: Arc<RwLock<HashMap<&'static str, StoreError>>>,
    /// Artificial delay before every operation.
    latency: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockQueueStore {
    /// Create a new mock store with an empty queue.
    pub fn new() -> Self {
        Self {
            inner: MemoryQueueStore::new(),
            calls: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            latency: Arc::new(RwLock::new(None)),
        }
    }

    /// The backing memory store, for seeding and inspecting state directly.
    pub fn inner(&self) -> &MemoryQueueStore {
        &self.inner
    }

    /// Make every call to `operation` fail with `error` until cleared.
    pub async fn fail_on(&self, operation: &'static str, error: StoreError) {
        self.failures.write().await.insert(operation, error);
    }

    /// Clear all configured failures.
    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    /// Delay every operation by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = Some(latency);
    }

    /// Remove the artificial delay.
    pub async fn clear_latency(&self) {
        *self.latency.write().await = None;
    }

    /// Get recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Number of calls made to `operation`.
    pub async fn call_count(&self, operation: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    async fn enter(&self, operation: &'static str) -> Result<(), StoreError> {
        self.calls.write().await.push(RecordedCall {
            operation,
            timestamp: Instant::now(),
        });

        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match self.failures.read().await.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QueueStore for MockQueueStore {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn issue_ticket(&self, client: &ClientId) -> Result<Ticket, StoreError> {
        self.enter("issue_ticket").await?;
        self.inner.issue_ticket(client).await
    }

    async fn ticket_for(&self, client: &ClientId) -> Result<Option<Ticket>, StoreError> {
        self.enter("ticket_for").await?;
        self.inner.ticket_for(client).await
    }

    async fn waiting_position(&self, client: &ClientId) -> Result<Option<u64>, StoreError> {
        self.enter("waiting_position").await?;
        self.inner.waiting_position(client).await
    }

    async fn is_admitted(&self, client: &ClientId) -> Result<bool, StoreError> {
        self.enter("is_admitted").await?;
        self.inner.is_admitted(client).await
    }

    async fn oldest_waiting(&self, limit: u64) -> Result<Vec<WaitEntry>, StoreError> {
        self.enter("oldest_waiting").await?;
        self.inner.oldest_waiting(limit).await
    }

    async fn promote(
        &self,
        credentials: &[AdmissionCredential],
        ttl: Duration,
    ) -> Result<PromotionResult, StoreError> {
        self.enter("promote").await?;
        self.inner.promote(credentials, ttl).await
    }

    async fn credential_for(
        &self,
        client: &ClientId,
    ) -> Result<Option<AdmissionCredential>, StoreError> {
        self.enter("credential_for").await?;
        self.inner.credential_for(client).await
    }

    async fn counters(&self) -> Result<QueueCounters, StoreError> {
        self.enter("counters").await?;
        self.inner.counters().await
    }

    async fn admit_rate(&self) -> Result<Option<String>, StoreError> {
        self.enter("admit_rate").await?;
        self.inner.admit_rate().await
    }

    async fn set_admit_rate(&self, rate: u64) -> Result<(), StoreError> {
        self.enter("set_admit_rate").await?;
        self.inner.set_admit_rate(rate).await
    }
}
