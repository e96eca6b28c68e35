//! In-process queue store.
//!
//! Keeps the same atomicity guarantees as the Redis store by running every
//! compound operation under a single lock acquisition. State lives only as
//! long as the process.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{
    AdmissionCredential, ClientId, PromotionResult, QueueCounters, QueueStore, StoreError, Ticket,
    WaitEntry,
};

#[derive(Debug, Default)]
struct State {
    next_ticket: u64,
    now_serving: u64,
    tickets: HashMap<ClientId, Ticket>,
    /// Waiting set keyed by ticket; tickets are unique so the key is the score.
    waiting: BTreeMap<Ticket, ClientId>,
    admitted: HashSet<ClientId>,
    credentials: HashMap<ClientId, AdmissionCredential>,
    admit_rate: Option<String>,
}

/// Single-process queue store.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    state: Mutex<State>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Store a raw rate value, bypassing validation (useful for testing
    /// fallback behavior).
    pub fn set_raw_admit_rate(&self, raw: Option<&str>) -> Result<(), StoreError> {
        self.lock()?.admit_rate = raw.map(str::to_string);
        Ok(())
    }

    /// Drop a waiting entry without admitting it, as an external pruner would.
    pub fn remove_waiting(&self, client: &ClientId) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let Some(ticket) = state.tickets.get(client).copied() else {
            return Ok(false);
        };
        Ok(state.waiting.remove(&ticket).is_some())
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn issue_ticket(&self, client: &ClientId) -> Result<Ticket, StoreError> {
        let mut state = self.lock()?;
        if let Some(ticket) = state.tickets.get(client).copied() {
            if state.waiting.contains_key(&ticket) || state.admitted.contains(client) {
                return Ok(ticket);
            }
        }

        state.next_ticket += 1;
        let ticket = Ticket(state.next_ticket);
        state.waiting.insert(ticket, client.clone());
        state.tickets.insert(client.clone(), ticket);
        Ok(ticket)
    }

    async fn ticket_for(&self, client: &ClientId) -> Result<Option<Ticket>, StoreError> {
        Ok(self.lock()?.tickets.get(client).copied())
    }

    async fn waiting_position(&self, client: &ClientId) -> Result<Option<u64>, StoreError> {
        let state = self.lock()?;
        let Some(ticket) = state.tickets.get(client).copied() else {
            return Ok(None);
        };
        if !state.waiting.contains_key(&ticket) {
            return Ok(None);
        }
        Ok(Some(state.waiting.range(..=ticket).count() as u64))
    }

    async fn is_admitted(&self, client: &ClientId) -> Result<bool, StoreError> {
        Ok(self.lock()?.admitted.contains(client))
    }

    async fn oldest_waiting(&self, limit: u64) -> Result<Vec<WaitEntry>, StoreError> {
        let state = self.lock()?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(state
            .waiting
            .iter()
            .take(limit)
            .map(|(ticket, client)| WaitEntry {
                client: client.clone(),
                ticket: *ticket,
            })
            .collect())
    }

    async fn promote(
        &self,
        credentials: &[AdmissionCredential],
        _ttl: Duration,
    ) -> Result<PromotionResult, StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        state.credentials.retain(|_, c| !c.is_expired_at(now));

        let mut promoted = Vec::with_capacity(credentials.len());

        for credential in credentials {
            let waiting_ticket = state.tickets.get(&credential.client).copied();
            let removed = match waiting_ticket {
                Some(ticket) => state.waiting.remove(&ticket).is_some(),
                None => false,
            };
            if removed {
                state.admitted.insert(credential.client.clone());
                state
                    .credentials
                    .insert(credential.client.clone(), credential.clone());
                promoted.push(credential.clone());
            }
        }

        state.now_serving += promoted.len() as u64;
        Ok(PromotionResult {
            promoted,
            now_serving: state.now_serving,
        })
    }

    async fn credential_for(
        &self,
        client: &ClientId,
    ) -> Result<Option<AdmissionCredential>, StoreError> {
        let mut state = self.lock()?;
        let Some(credential) = state.credentials.get(client) else {
            return Ok(None);
        };
        if credential.is_expired_at(Utc::now()) {
            state.credentials.remove(client);
            return Ok(None);
        }
        Ok(Some(credential.clone()))
    }

    async fn counters(&self) -> Result<QueueCounters, StoreError> {
        let state = self.lock()?;
        Ok(QueueCounters {
            now_serving: state.now_serving,
            next_ticket: state.next_ticket,
            waiting: state.waiting.len() as u64,
        })
    }

    async fn admit_rate(&self) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.admit_rate.clone())
    }

    async fn set_admit_rate(&self, rate: u64) -> Result<(), StoreError> {
        self.lock()?.admit_rate = Some(rate.to_string());
        Ok(())
    }
}
