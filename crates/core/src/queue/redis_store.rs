//! Redis-backed queue store.
//!
//! # Layout
//!
//! - `event:{id}:next_ticket` - INCR sequence, last issued ticket
//! - `event:{id}:tickets` - hash of client -> ticket
//! - `event:{id}:waiting` - sorted set of waiting clients, scored by ticket
//! - `event:{id}:now_serving` - number of admitted clients
//! - `event:{id}:promoted` - hash of client -> ticket for promoted clients
//! - `event:{id}:admitted:{client}` - JSON credential with TTL
//! - `event:{id}:admit_rate` - runtime admission rate
//!
//! Compound operations run as Lua scripts so they execute atomically on the
//! server.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use tracing::debug;

use super::{
    AdmissionCredential, ClientId, PromotionResult, QueueCounters, QueueKeys, QueueStore,
    StoreError, Ticket, WaitEntry,
};

/// KEYS: tickets, next_ticket, waiting, promoted. ARGV: client.
///
/// A held ticket is returned while the client is waiting or promoted. A
/// client pruned from the waiting set out of band gets a fresh ticket.
const ISSUE_TICKET_LUA: &str = r#"
local existing = redis.call('HGET', KEYS[1], ARGV[1])
if existing then
    if redis.call('ZSCORE', KEYS[3], ARGV[1]) or redis.call('HEXISTS', KEYS[4], ARGV[1]) == 1 then
        return tonumber(existing)
    end
end

local ticket = redis.call('INCR', KEYS[2])
redis.call('ZADD', KEYS[3], ticket, ARGV[1])
redis.call('HSET', KEYS[1], ARGV[1], ticket)
return ticket
"#;

/// KEYS: waiting. ARGV: client. Returns -1 when not waiting.
const POSITION_LUA: &str = r#"
local score = redis.call('ZSCORE', KEYS[1], ARGV[1])
if not score then
    return -1
end
return redis.call('ZCOUNT', KEYS[1], '-inf', score)
"#;

/// KEYS: waiting, now_serving, promoted, then one credential key per client.
/// ARGV: ttl_secs, then (client, ticket, credential) triples in KEYS order.
/// Returns { now_serving, { promoted clients... } }.
const PROMOTE_LUA: &str = r#"
local ttl = tonumber(ARGV[1])
local promoted = {}

for i = 4, #KEYS do
    local base = 2 + (i - 4) * 3
    local client = ARGV[base]
    if redis.call('ZREM', KEYS[1], client) == 1 then
        redis.call('HSET', KEYS[3], client, ARGV[base + 1])
        redis.call('SET', KEYS[i], ARGV[base + 2], 'EX', ttl)
        table.insert(promoted, client)
    end
end

local cursor
if #promoted > 0 then
    cursor = redis.call('INCRBY', KEYS[2], #promoted)
else
    cursor = tonumber(redis.call('GET', KEYS[2]) or '0')
end
return { cursor, promoted }
"#;

/// Queue store backed by Redis.
///
/// Cheap to clone; clones share the underlying connection manager.
#[derive(Clone)]
pub struct RedisQueueStore {
    conn_manager: ConnectionManager,
    keys: QueueKeys,
    issue_script: Script,
    position_script: Script,
    promote_script: Script,
}

impl RedisQueueStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the initial connection fails.
    pub async fn new(redis_url: &str, keys: QueueKeys) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Connection(format!("invalid Redis URL: {}", e)))?;

        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(format!("failed to connect to Redis: {}", e)))?;

        Ok(Self {
            conn_manager,
            keys,
            issue_script: Script::new(ISSUE_TICKET_LUA),
            position_script: Script::new(POSITION_LUA),
            promote_script: Script::new(PROMOTE_LUA),
        })
    }

    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn issue_ticket(&self, client: &ClientId) -> Result<Ticket, StoreError> {
        let mut conn = self.conn_manager.clone();
        let ticket: u64 = self
            .issue_script
            .key(self.keys.tickets())
            .key(self.keys.next_ticket())
            .key(self.keys.waiting())
            .key(self.keys.promoted())
            .arg(client.as_str())
            .invoke_async(&mut conn)
            .await?;

        Ok(Ticket(ticket))
    }

    async fn ticket_for(&self, client: &ClientId) -> Result<Option<Ticket>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let ticket: Option<u64> = conn.hget(self.keys.tickets(), client.as_str()).await?;
        Ok(ticket.map(Ticket))
    }

    async fn waiting_position(&self, client: &ClientId) -> Result<Option<u64>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let rank: i64 = self
            .position_script
            .key(self.keys.waiting())
            .arg(client.as_str())
            .invoke_async(&mut conn)
            .await?;

        Ok(u64::try_from(rank).ok())
    }

    async fn is_admitted(&self, client: &ClientId) -> Result<bool, StoreError> {
        let mut conn = self.conn_manager.clone();
        let admitted: bool = conn.hexists(self.keys.promoted(), client.as_str()).await?;
        Ok(admitted)
    }

    async fn oldest_waiting(&self, limit: u64) -> Result<Vec<WaitEntry>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn_manager.clone();
        let stop = isize::try_from(limit - 1).unwrap_or(isize::MAX);
        let rows: Vec<(String, f64)> = conn
            .zrange_withscores(self.keys.waiting(), 0, stop)
            .await?;

        decode_entries(rows)
    }

    async fn promote(
        &self,
        credentials: &[AdmissionCredential],
        ttl: Duration,
    ) -> Result<PromotionResult, StoreError> {
        let mut conn = self.conn_manager.clone();

        let mut invocation = self.promote_script.prepare_invoke();
        invocation
            .key(self.keys.waiting())
            .key(self.keys.now_serving())
            .key(self.keys.promoted())
            .arg(ttl.as_secs().max(1));

        for credential in credentials {
            let payload = serde_json::to_string(credential)
                .map_err(|e| StoreError::Corrupt(format!("cannot encode credential: {}", e)))?;
            invocation
                .key(self.keys.credential(&credential.client))
                .arg(credential.client.as_str())
                .arg(credential.ticket.value())
                .arg(payload);
        }

        let (now_serving, promoted): (u64, Vec<String>) = invocation.invoke_async(&mut conn).await?;

        if promoted.len() < credentials.len() {
            debug!(
                requested = credentials.len(),
                promoted = promoted.len(),
                "Some entries left the waiting set before promotion"
            );
        }

        let promoted: HashSet<String> = promoted.into_iter().collect();
        Ok(PromotionResult {
            promoted: credentials
                .iter()
                .filter(|c| promoted.contains(c.client.as_str()))
                .cloned()
                .collect(),
            now_serving,
        })
    }

    async fn credential_for(
        &self,
        client: &ClientId,
    ) -> Result<Option<AdmissionCredential>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let payload: Option<String> = conn.get(self.keys.credential(client)).await?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let credential: AdmissionCredential = serde_json::from_str(&payload)
            .map_err(|e| StoreError::Corrupt(format!("credential for {}: {}", client, e)))?;

        // Redis TTL and our clock can disagree by a little.
        if credential.is_expired_at(Utc::now()) {
            return Ok(None);
        }
        Ok(Some(credential))
    }

    async fn counters(&self) -> Result<QueueCounters, StoreError> {
        let mut conn = self.conn_manager.clone();
        let (now_serving, next_ticket, waiting): (Option<u64>, Option<u64>, u64) = redis::pipe()
            .get(self.keys.now_serving())
            .get(self.keys.next_ticket())
            .zcard(self.keys.waiting())
            .query_async(&mut conn)
            .await?;

        Ok(QueueCounters {
            now_serving: now_serving.unwrap_or(0),
            next_ticket: next_ticket.unwrap_or(0),
            waiting,
        })
    }

    async fn admit_rate(&self) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let raw: Option<String> = conn.get(self.keys.admit_rate()).await?;
        Ok(raw)
    }

    async fn set_admit_rate(&self, rate: u64) -> Result<(), StoreError> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn.set(self.keys.admit_rate(), rate).await?;
        Ok(())
    }
}

/// Decode `ZRANGE ... WITHSCORES` rows into wait entries.
fn decode_entries(rows: Vec<(String, f64)>) -> Result<Vec<WaitEntry>, StoreError> {
    rows.into_iter()
        .map(|(member, score)| {
            if !score.is_finite() || score < 1.0 || score.fract() != 0.0 {
                return Err(StoreError::Corrupt(format!(
                    "waiting entry {} has invalid ticket score {}",
                    member, score
                )));
            }
            let client = ClientId::parse(&member)
                .map_err(|e| StoreError::Corrupt(format!("waiting member: {}", e)))?;
            Ok(WaitEntry {
                client,
                ticket: Ticket(score as u64),
            })
        })
        .collect()
}
