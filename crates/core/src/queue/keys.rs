//! Store key layout for one queue namespace.

use super::ClientId;

/// Key names for one event's queue.
///
/// Every key shares the `event:{event_id}:` prefix so several events can
/// share one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    event_id: String,
    prefix: String,
}

impl QueueKeys {
    pub fn new(event_id: impl Into<String>) -> Self {
        let event_id = event_id.into();
        let prefix = format!("event:{}:", event_id);
        Self { event_id, prefix }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Counter holding the last issued ticket.
    pub fn next_ticket(&self) -> String {
        format!("{}next_ticket", self.prefix)
    }

    /// Counter holding the number of admitted clients.
    pub fn now_serving(&self) -> String {
        format!("{}now_serving", self.prefix)
    }

    /// Hash of client -> ticket.
    pub fn tickets(&self) -> String {
        format!("{}tickets", self.prefix)
    }

    /// Sorted set of waiting clients scored by ticket.
    pub fn waiting(&self) -> String {
        format!("{}waiting", self.prefix)
    }

    /// Hash of client -> ticket for every promoted client.
    pub fn promoted(&self) -> String {
        format!("{}promoted", self.prefix)
    }

    /// Runtime admission rate (clients per tick).
    pub fn admit_rate(&self) -> String {
        format!("{}admit_rate", self.prefix)
    }

    /// Prefix of the per-client credential keys.
    pub fn credential_prefix(&self) -> String {
        format!("{}admitted:", self.prefix)
    }

    pub fn credential(&self, client: &ClientId) -> String {
        format!("{}{}", self.credential_prefix(), client)
    }
}
