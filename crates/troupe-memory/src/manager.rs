//! Scoped memory and mailboxes for agents.
//!
//! Two keyed namespaces with TTL semantics plus per-agent message queues:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  AgentMemoryManager                      │
//! │                                                          │
//! │  agent-private   agent_id  → key → MemoryEntry           │
//! │  tenant-shared   tenant_id → key → MemoryEntry           │
//! │  mailboxes       agent_id  → [AgentMessage, …]           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Expiry is lazy: a read past `expires_at` removes the entry and behaves
//! as absent. [`AgentMemoryManager::sweep_expired`] is available as an
//! optional hygiene pass; correctness does not depend on it.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use troupe_core::protocol::{AgentMessage, MessageKind};

/// A stored value with creation time and optional expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Opaque stored value
    pub value: serde_json::Value,
    /// When the entry was stored
    pub created_at: DateTime<Utc>,
    /// Expiry after which the entry behaves as absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemoryEntry {
    /// Create an entry, expiring `ttl_ms` from now if given.
    #[must_use]
    pub fn new(value: serde_json::Value, ttl_ms: Option<u64>) -> Self {
        let now = Utc::now();
        Self {
            value,
            created_at: now,
            expires_at: ttl_ms.map(|ms| now + Duration::milliseconds(ms as i64)),
        }
    }

    /// Whether the entry has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

type Namespace = HashMap<String, HashMap<String, MemoryEntry>>;

/// In-process memory manager shared by all concurrently running agents.
///
/// Safe for concurrent read/write; every map is guarded by its own lock.
/// Does NOT persist across restarts.
#[derive(Debug, Default)]
pub struct AgentMemoryManager {
    /// Private memory: agent_id → key → entry
    agent_memory: RwLock<Namespace>,
    /// Shared memory: tenant_id → key → entry
    shared_memory: RwLock<Namespace>,
    /// Inbound queues: agent_id → messages
    mailboxes: RwLock<HashMap<String, Vec<AgentMessage>>>,
}

impl AgentMemoryManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Agent-private memory ─────────────────────────────────────────────

    /// Store a value in an agent's private memory.
    pub async fn store_agent_memory(
        &self,
        agent_id: &str,
        key: &str,
        value: serde_json::Value,
        ttl_ms: Option<u64>,
    ) {
        debug!(agent_id, key, ttl_ms = ?ttl_ms, "storing agent memory");
        let mut memory = self.agent_memory.write().await;
        memory
            .entry(agent_id.to_string())
            .or_default()
            .insert(key.to_string(), MemoryEntry::new(value, ttl_ms));
    }

    /// Read a value from an agent's private memory.
    ///
    /// An expired entry is removed and reported as absent.
    pub async fn get_agent_memory(&self, agent_id: &str, key: &str) -> Option<serde_json::Value> {
        let mut memory = self.agent_memory.write().await;
        read_entry(&mut memory, agent_id, key)
    }

    // ─── Tenant-shared memory ─────────────────────────────────────────────

    /// Store a value in a tenant's shared memory.
    pub async fn store_shared_memory(
        &self,
        tenant_id: &str,
        key: &str,
        value: serde_json::Value,
        ttl_ms: Option<u64>,
    ) {
        debug!(tenant_id, key, ttl_ms = ?ttl_ms, "storing shared memory");
        let mut memory = self.shared_memory.write().await;
        memory
            .entry(tenant_id.to_string())
            .or_default()
            .insert(key.to_string(), MemoryEntry::new(value, ttl_ms));
    }

    /// Read a value from a tenant's shared memory.
    ///
    /// An expired entry is removed and reported as absent.
    pub async fn get_shared_memory(&self, tenant_id: &str, key: &str) -> Option<serde_json::Value> {
        let mut memory = self.shared_memory.write().await;
        read_entry(&mut memory, tenant_id, key)
    }

    // ─── Mailboxes ────────────────────────────────────────────────────────

    /// Append a message to the recipient's mailbox.
    pub async fn send_message(&self, message: AgentMessage) {
        debug!(
            from = %message.from_agent,
            to = %message.to_agent,
            kind = ?message.kind,
            "queueing message"
        );
        let mut boxes = self.mailboxes.write().await;
        boxes
            .entry(message.to_agent.clone())
            .or_default()
            .push(message);
    }

    /// Take messages from an agent's mailbox.
    ///
    /// Without a kind filter the whole mailbox is drained. With a filter,
    /// matching messages are removed and returned; expired messages of any
    /// kind are pruned in the same pass. Expired messages are never
    /// returned.
    pub async fn receive_messages(
        &self,
        agent_id: &str,
        kind: Option<MessageKind>,
    ) -> Vec<AgentMessage> {
        let now = Utc::now();
        let mut boxes = self.mailboxes.write().await;
        let Some(queue) = boxes.get_mut(agent_id) else {
            return Vec::new();
        };

        match kind {
            None => {
                let drained = std::mem::take(queue);
                drained
                    .into_iter()
                    .filter(|m| !m.is_expired(now))
                    .collect()
            }
            Some(kind) => {
                let mut delivered = Vec::new();
                queue.retain(|m| {
                    if m.is_expired(now) {
                        return false;
                    }
                    if m.kind == kind {
                        delivered.push(m.clone());
                        return false;
                    }
                    true
                });
                delivered
            }
        }
    }

    // ─── Lifecycle ────────────────────────────────────────────────────────

    /// Drop an agent's private memory and mailbox.
    ///
    /// Called once a workflow using the agent reaches a terminal state so
    /// memory growth stays bounded.
    pub async fn cleanup_agent_memory(&self, agent_id: &str) {
        debug!(agent_id, "cleaning up agent memory");
        self.agent_memory.write().await.remove(agent_id);
        self.mailboxes.write().await.remove(agent_id);
    }

    /// Remove every expired entry and message. Returns the number removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut removed = 0;

        for namespace in [&self.agent_memory, &self.shared_memory] {
            let mut memory = namespace.write().await;
            for entries in memory.values_mut() {
                let before = entries.len();
                entries.retain(|_, e| !e.is_expired(now));
                removed += before - entries.len();
            }
            memory.retain(|_, entries| !entries.is_empty());
        }

        let mut boxes = self.mailboxes.write().await;
        for queue in boxes.values_mut() {
            let before = queue.len();
            queue.retain(|m| !m.is_expired(now));
            removed += before - queue.len();
        }
        boxes.retain(|_, queue| !queue.is_empty());

        if removed > 0 {
            debug!(removed, "swept expired memory entries");
        }
        removed
    }
}

/// Shared lazy-expiry read for both keyed namespaces.
fn read_entry(namespace: &mut Namespace, owner: &str, key: &str) -> Option<serde_json::Value> {
    let entries = namespace.get_mut(owner)?;
    let expired = entries.get(key)?.is_expired(Utc::now());
    if expired {
        entries.remove(key);
        return None;
    }
    entries.get(key).map(|e| e.value.clone())
}
