//! Core waiting-room data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::QueueError;

/// Maximum accepted length of a client identity, in bytes.
pub const MAX_CLIENT_ID_LEN: usize = 256;

// ============================================================================
// Identity and Ticket
// ============================================================================

/// Opaque, stable handle identifying one waiting participant.
///
/// Supplied by whatever layer owns client sessions. It is the idempotency key
/// for ticket issuance: the same `ClientId` always maps to the same ticket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Validate a raw identity.
    ///
    /// Surrounding whitespace is trimmed. Empty identities and identities
    /// longer than [`MAX_CLIENT_ID_LEN`] are rejected with
    /// [`QueueError::InvalidInput`].
    pub fn parse(raw: &str) -> Result<Self, QueueError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QueueError::InvalidInput(
                "client identity is required".to_string(),
            ));
        }
        if trimmed.len() > MAX_CLIENT_ID_LEN {
            return Err(QueueError::InvalidInput(format!(
                "client identity exceeds {} bytes",
                MAX_CLIENT_ID_LEN
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A ticket number. Drawn from one strictly increasing sequence starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(pub u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A client's live membership record in the waiting set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitEntry {
    pub client: ClientId,
    pub ticket: Ticket,
}

// ============================================================================
// Admission
// ============================================================================

/// Short-lived proof of admission handed to a promoted client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionCredential {
    /// Client the credential is bound to.
    pub client: ClientId,
    /// Ticket the client held while waiting.
    pub ticket: Ticket,
    /// Unguessable token checked by the protected resource.
    pub token: String,
    /// When the client was promoted.
    pub admitted_at: DateTime<Utc>,
    /// After this instant the credential is no longer valid.
    pub expires_at: DateTime<Utc>,
}

impl AdmissionCredential {
    /// Mint a fresh credential for a waiting entry.
    pub fn mint(entry: &WaitEntry, admitted_at: DateTime<Utc>, ttl: std::time::Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        Self {
            client: entry.client.clone(),
            ticket: entry.ticket,
            token: uuid::Uuid::new_v4().simple().to_string(),
            admitted_at,
            expires_at: admitted_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Outcome of one atomic promotion batch against the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionResult {
    /// Credentials that were actually stored, in ticket order.
    ///
    /// Entries whose removal did not happen (already gone from the waiting
    /// set) are absent, and no credential was stored for them.
    pub promoted: Vec<AdmissionCredential>,
    /// Admission cursor after the batch.
    pub now_serving: u64,
}

/// Report of one admission pass (worker tick or manual admission).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmitReport {
    /// Number of clients promoted from waiting to admitted.
    pub promoted_count: u64,
    /// Admission cursor after the pass.
    pub now_serving: u64,
    /// Promoted entries, smallest ticket first.
    pub promoted: Vec<WaitEntry>,
}

// ============================================================================
// Status
// ============================================================================

/// Store-level counters for one queue namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounters {
    /// Number of clients admitted so far.
    pub now_serving: u64,
    /// Last ticket number issued (0 before the first join).
    pub next_ticket: u64,
    /// Number of entries currently in the waiting set.
    pub waiting: u64,
}

/// Position and wait estimate for a waiting client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub ticket: Ticket,
    /// 1-based rank among waiting clients; 0 once admitted.
    pub position: u64,
    pub eta_seconds: u64,
    pub now_serving: u64,
    pub next_ticket: u64,
    /// Admission rate the estimate was computed with.
    pub admit_rate: u64,
}

/// Where a join left the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinState {
    Waiting,
    /// Already promoted; the original ticket is returned with position 0.
    Admitted,
}

/// Result of a join: the client's state plus its position estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStatus {
    pub state: JoinState,
    #[serde(flatten)]
    pub status: QueueStatus,
}

impl JoinStatus {
    pub fn is_admitted(&self) -> bool {
        self.state == JoinState::Admitted
    }
}

/// Status of an admitted client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmittedStatus {
    pub ticket: Ticket,
    /// `None` once the credential has expired.
    pub credential: Option<AdmissionCredential>,
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusOutcome {
    Waiting(QueueStatus),
    Admitted(AdmittedStatus),
    NotInQueue,
}

impl StatusOutcome {
    pub fn state_name(&self) -> &'static str {
        match self {
            StatusOutcome::Waiting(_) => "waiting",
            StatusOutcome::Admitted(_) => "admitted",
            StatusOutcome::NotInQueue => "not_in_queue",
        }
    }
}
