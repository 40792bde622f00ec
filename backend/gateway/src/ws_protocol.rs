//! WebSocket frame schema.
//!
//! JSON objects tagged by `type`. Inbound and outbound frames are separate
//! enums because the server relays under different names and fields than the
//! client sends (`message` goes out as `new_message`, and so on).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use liime_core::{ChatId, FrameError, RealtimeEvent, UserId};
use serde::{Deserialize, Serialize};

/// Client -> server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Chat message for a peer or a group chat
    Message {
        recipient_id: UserId,
        chat_id: ChatId,
        content: String,
    },
    /// Typing indicator for a peer
    Typing { recipient_id: UserId },
    /// Messages in a chat were read
    Read { chat_id: ChatId },
    /// Application-level keepalive
    Ping,
}

/// Server -> client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    NewMessage {
        chat_id: ChatId,
        sender_id: UserId,
        content: String,
        timestamp: DateTime<Utc>,
    },
    Typing {
        user_id: UserId,
    },
    ReadReceipt {
        chat_id: ChatId,
        user_id: UserId,
    },
    StatusChange {
        user_id: UserId,
        is_online: bool,
    },
    Pong,
}

impl ClientFrame {
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ServerFrame {
    /// Encode once; the result is shared by every recipient.
    pub fn encode(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}

impl From<&RealtimeEvent> for ServerFrame {
    fn from(event: &RealtimeEvent) -> Self {
        match event {
            RealtimeEvent::ChatMessage {
                chat_id,
                sender,
                content,
                timestamp,
                ..
            } => ServerFrame::NewMessage {
                chat_id: *chat_id,
                sender_id: *sender,
                content: content.clone(),
                timestamp: *timestamp,
            },
            RealtimeEvent::TypingSignal { sender, .. } => ServerFrame::Typing { user_id: *sender },
            RealtimeEvent::ReadReceipt { chat_id, sender } => ServerFrame::ReadReceipt {
                chat_id: *chat_id,
                user_id: *sender,
            },
            RealtimeEvent::StatusChange { user, is_online } => ServerFrame::StatusChange {
                user_id: *user,
                is_online: *is_online,
            },
        }
    }
}
