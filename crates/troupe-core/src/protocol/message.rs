//! Message types exchanged between agents through their mailboxes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of inter-agent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Payload handed from one agent to another
    Data,
    /// Coordination signal
    Control,
    /// Error notification
    Error,
    /// Liveness ping
    Heartbeat,
}

/// A message addressed to one agent's mailbox.
///
/// Created by one agent's execution, consumed (and removed) by the
/// addressed agent's next read. Expired messages are never delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Unique message ID
    pub message_id: String,
    /// Sending agent
    pub from_agent: String,
    /// Receiving agent
    pub to_agent: String,
    /// Message kind
    pub kind: MessageKind,
    /// Opaque payload
    pub content: serde_json::Value,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Expiry after which the message behaves as absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AgentMessage {
    /// Create a message of the given kind.
    #[must_use]
    pub fn new(
        from_agent: impl Into<String>,
        to_agent: impl Into<String>,
        kind: MessageKind,
        content: serde_json::Value,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            from_agent: from_agent.into(),
            to_agent: to_agent.into(),
            kind,
            content,
            timestamp: Utc::now(),
            expires_at: None,
        }
    }

    /// Create a data message.
    #[must_use]
    pub fn data(
        from_agent: impl Into<String>,
        to_agent: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self::new(from_agent, to_agent, MessageKind::Data, content)
    }

    /// Create a control message.
    #[must_use]
    pub fn control(
        from_agent: impl Into<String>,
        to_agent: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self::new(from_agent, to_agent, MessageKind::Control, content)
    }

    /// Create an error message.
    #[must_use]
    pub fn error(
        from_agent: impl Into<String>,
        to_agent: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self::new(from_agent, to_agent, MessageKind::Error, content)
    }

    /// Create a heartbeat message.
    #[must_use]
    pub fn heartbeat(from_agent: impl Into<String>, to_agent: impl Into<String>) -> Self {
        Self::new(
            from_agent,
            to_agent,
            MessageKind::Heartbeat,
            serde_json::Value::Null,
        )
    }

    /// Expire this message `ttl_ms` after its creation time.
    #[must_use]
    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.expires_at = Some(self.timestamp + Duration::milliseconds(ttl_ms as i64));
        self
    }

    /// Whether the message has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}
