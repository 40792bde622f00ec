use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChatId, UserId};

/// An ephemeral real-time event moving between connected peers.
///
/// Never persisted here; delivery is at-most-once and best-effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    ChatMessage {
        chat_id: ChatId,
        sender: UserId,
        recipient: UserId,
        content: String,
        timestamp: DateTime<Utc>,
    },
    TypingSignal {
        sender: UserId,
        recipient: UserId,
    },
    ReadReceipt {
        chat_id: ChatId,
        sender: UserId,
    },
    StatusChange {
        user: UserId,
        is_online: bool,
    },
}

/// Discriminant of a [`RealtimeEvent`], used for logging and counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ChatMessage,
    TypingSignal,
    ReadReceipt,
    StatusChange,
}

impl RealtimeEvent {
    /// Build a chat message stamped with the current time.
    pub fn chat_message(
        chat_id: ChatId,
        sender: UserId,
        recipient: UserId,
        content: impl Into<String>,
    ) -> Self {
        RealtimeEvent::ChatMessage {
            chat_id,
            sender,
            recipient,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            RealtimeEvent::ChatMessage { .. } => EventKind::ChatMessage,
            RealtimeEvent::TypingSignal { .. } => EventKind::TypingSignal,
            RealtimeEvent::ReadReceipt { .. } => EventKind::ReadReceipt,
            RealtimeEvent::StatusChange { .. } => EventKind::StatusChange,
        }
    }

    /// The user that caused this event.
    pub fn origin(&self) -> UserId {
        match self {
            RealtimeEvent::ChatMessage { sender, .. }
            | RealtimeEvent::TypingSignal { sender, .. }
            | RealtimeEvent::ReadReceipt { sender, .. } => *sender,
            RealtimeEvent::StatusChange { user, .. } => *user,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}
