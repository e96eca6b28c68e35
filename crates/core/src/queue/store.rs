//! Shared store contract.

use std::time::Duration;

use async_trait::async_trait;

use super::{
    AdmissionCredential, ClientId, PromotionResult, QueueCounters, StoreError, Ticket, WaitEntry,
};

/// Backend that owns all queue state for one namespace.
///
/// The process holds no authoritative copy of any counter. Every compound
/// check-and-mutate sequence below is a single indivisible operation on the
/// backend; callers never combine separate reads and writes to emulate one.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Name of this backend, for logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Return the client's ticket, issuing a new one if it has none.
    ///
    /// Atomic get-or-create: on first call the sequence is incremented once
    /// and both the client -> ticket mapping and the waiting-set entry are
    /// recorded. Concurrent calls for the same client observe the same ticket.
    /// A client whose ticket is neither waiting nor promoted (its entry was
    /// pruned out of band) is issued a fresh ticket at the back of the queue.
    async fn issue_ticket(&self, client: &ClientId) -> Result<Ticket, StoreError>;

    /// Ticket previously issued to the client, if any.
    async fn ticket_for(&self, client: &ClientId) -> Result<Option<Ticket>, StoreError>;

    /// 1-based rank of the client among waiting entries (count of entries
    /// with a ticket <= the client's), or `None` when it is not waiting.
    async fn waiting_position(&self, client: &ClientId) -> Result<Option<u64>, StoreError>;

    /// Whether the client was promoted by [`promote`](Self::promote).
    async fn is_admitted(&self, client: &ClientId) -> Result<bool, StoreError>;

    /// Up to `limit` waiting entries, smallest ticket first.
    async fn oldest_waiting(&self, limit: u64) -> Result<Vec<WaitEntry>, StoreError>;

    /// Promote a batch in one atomic operation.
    ///
    /// For each credential, the entry is removed from the waiting set and,
    /// only if that removal happened, the client is recorded as promoted and
    /// the credential is stored with `ttl`.
    /// The admission cursor advances by the number of entries promoted.
    async fn promote(
        &self,
        credentials: &[AdmissionCredential],
        ttl: Duration,
    ) -> Result<PromotionResult, StoreError>;

    /// Live credential for an admitted client.
    async fn credential_for(
        &self,
        client: &ClientId,
    ) -> Result<Option<AdmissionCredential>, StoreError>;

    /// Current counters.
    async fn counters(&self) -> Result<QueueCounters, StoreError>;

    /// Raw runtime admission rate, exactly as stored.
    async fn admit_rate(&self) -> Result<Option<String>, StoreError>;

    /// Overwrite the runtime admission rate.
    async fn set_admit_rate(&self, rate: u64) -> Result<(), StoreError>;
}
