//! Ticket issuance and status estimation.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::Config;
use crate::metrics::{
    JOIN_REQUESTS, RATE_FALLBACKS, STATUS_QUERIES, STORE_ERRORS, STORE_OPERATION_DURATION,
};

use super::estimator::{eta_seconds, RateSnapshot};
use super::{
    AdmittedStatus, ClientId, JoinState, JoinStatus, QueueCounters, QueueError, QueueStatus,
    QueueStore, StatusOutcome, StoreError, Ticket,
};

/// Tunables for [`QueueService`].
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Rate used when the runtime rate is missing or invalid.
    pub fallback_admit_rate: u64,
    /// Deadline for every single store round-trip.
    pub operation_timeout: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            fallback_admit_rate: 10,
            operation_timeout: Duration::from_secs(2),
        }
    }
}

impl From<&Config> for QueueSettings {
    fn from(config: &Config) -> Self {
        Self {
            fallback_admit_rate: config.queue.fallback_admit_rate,
            operation_timeout: Duration::from_millis(config.store.operation_timeout_ms),
        }
    }
}

/// Front door of the waiting room: join and status queries.
///
/// Holds no queue state of its own; every answer comes from the store.
pub struct QueueService {
    store: Arc<dyn QueueStore>,
    settings: QueueSettings,
}

impl QueueService {
    pub fn new(store: Arc<dyn QueueStore>, settings: QueueSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// Enter the queue, or return the ticket already held.
    ///
    /// Repeated joins for the same identity return the same ticket and never
    /// advance the sequence again. A client that was already admitted gets
    /// its original ticket back with position 0 and state `Admitted`.
    pub async fn join(&self, identity: &str) -> Result<JoinStatus, QueueError> {
        let client = match ClientId::parse(identity) {
            Ok(client) => client,
            Err(e) => {
                JOIN_REQUESTS.with_label_values(&["invalid"]).inc();
                return Err(e);
            }
        };

        let result = self.join_client(&client).await;
        JOIN_REQUESTS
            .with_label_values(&[if result.is_ok() { "ok" } else { "error" }])
            .inc();
        result
    }

    async fn join_client(&self, client: &ClientId) -> Result<JoinStatus, QueueError> {
        let ticket = self
            .call("issue_ticket", self.store.issue_ticket(client))
            .await?;
        let position = self
            .call("waiting_position", self.store.waiting_position(client))
            .await?;

        let state = match position {
            Some(_) => JoinState::Waiting,
            None => {
                debug!(client = %client, ticket = %ticket, "Join from already admitted client");
                JoinState::Admitted
            }
        };

        let status = self.describe(ticket, position.unwrap_or(0)).await?;
        debug!(
            client = %client,
            ticket = %ticket,
            position = status.position,
            eta_seconds = status.eta_seconds,
            "Client joined"
        );
        Ok(JoinStatus { state, status })
    }

    /// Current standing of a client.
    pub async fn status(&self, identity: &str) -> Result<StatusOutcome, QueueError> {
        let client = match ClientId::parse(identity) {
            Ok(client) => client,
            Err(e) => {
                STATUS_QUERIES.with_label_values(&["invalid"]).inc();
                return Err(e);
            }
        };

        let result = self.status_of(&client).await;
        let label = match &result {
            Ok(outcome) => outcome.state_name(),
            Err(_) => "error",
        };
        STATUS_QUERIES.with_label_values(&[label]).inc();
        result
    }

    async fn status_of(&self, client: &ClientId) -> Result<StatusOutcome, QueueError> {
        let Some(ticket) = self.call("ticket_for", self.store.ticket_for(client)).await? else {
            return Ok(StatusOutcome::NotInQueue);
        };

        if let Some(position) = self
            .call("waiting_position", self.store.waiting_position(client))
            .await?
        {
            return Ok(StatusOutcome::Waiting(
                self.describe(ticket, position).await?,
            ));
        }

        // Out of the waiting set without a promotion record: pruned, not admitted.
        if !self
            .call("is_admitted", self.store.is_admitted(client))
            .await?
        {
            return Ok(StatusOutcome::NotInQueue);
        }

        let credential = self
            .call("credential_for", self.store.credential_for(client))
            .await?;
        Ok(StatusOutcome::Admitted(AdmittedStatus { ticket, credential }))
    }

    async fn describe(&self, ticket: Ticket, position: u64) -> Result<QueueStatus, QueueError> {
        let (counters, rate) = tokio::join!(self.counters(), self.rate_snapshot());
        let counters = counters?;

        Ok(QueueStatus {
            ticket,
            position,
            eta_seconds: eta_seconds(position, &rate),
            now_serving: counters.now_serving,
            next_ticket: counters.next_ticket,
            admit_rate: rate.rate,
        })
    }

    /// Admission rate in effect right now.
    ///
    /// Never fails: a missing, invalid or unreadable runtime value yields the
    /// fallback rate, so estimates and the admission worker agree on pace.
    pub async fn rate_snapshot(&self) -> RateSnapshot {
        let fallback = self.settings.fallback_admit_rate;
        match self.call("admit_rate", self.store.admit_rate()).await {
            Ok(raw) => {
                let snapshot = RateSnapshot::resolve(raw.as_deref(), fallback);
                if snapshot.is_fallback() {
                    RATE_FALLBACKS.inc();
                    match raw {
                        Some(raw) => warn!(
                            raw = %raw,
                            fallback = snapshot.rate,
                            "Invalid admission rate in store, using fallback"
                        ),
                        None => debug!(fallback = snapshot.rate, "No admission rate set, using fallback"),
                    }
                }
                snapshot
            }
            Err(e) => {
                RATE_FALLBACKS.inc();
                warn!(error = %e, "Failed to read admission rate, using fallback");
                RateSnapshot::fallback(fallback)
            }
        }
    }

    /// Change the runtime admission rate.
    pub async fn set_admit_rate(&self, rate: u64) -> Result<(), QueueError> {
        if rate == 0 {
            return Err(QueueError::InvalidInput(
                "admission rate must be at least 1".to_string(),
            ));
        }
        self.call("set_admit_rate", self.store.set_admit_rate(rate))
            .await?;
        debug!(rate, "Admission rate updated");
        Ok(())
    }

    pub async fn counters(&self) -> Result<QueueCounters, QueueError> {
        self.call("counters", self.store.counters()).await
    }

    /// Run one store round-trip under the operation deadline.
    ///
    /// Dropping the returned future cancels the round-trip.
    pub(crate) async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, QueueError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let started = Instant::now();
        let result = tokio::time::timeout(self.settings.operation_timeout, fut).await;

        STORE_OPERATION_DURATION
            .with_label_values(&[self.store.backend_name(), operation])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                STORE_ERRORS.with_label_values(&[operation, "error"]).inc();
                Err(QueueError::Store(e))
            }
            Err(_) => {
                STORE_ERRORS.with_label_values(&[operation, "timeout"]).inc();
                Err(QueueError::Timeout(self.settings.operation_timeout))
            }
        }
    }
}
