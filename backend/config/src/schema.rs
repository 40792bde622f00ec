//! Liime server configuration schema.
//!
//! Every field is optional in the file; `defaults::apply_all_defaults` fills
//! the gaps, and the accessors on [`LiimeConfig`] fall back to the same
//! constants so callers never see a missing value.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::defaults::{
    DEFAULT_DRAIN_TIMEOUT_MS, DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_HOST, DEFAULT_LOG_LEVEL,
    DEFAULT_OUTBOUND_QUEUE_CAPACITY, DEFAULT_PING_TIMEOUT_SECS, DEFAULT_PORT,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiimeConfig {
    /// HTTP/WebSocket listener
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Real-time channel tuning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket: Option<WebSocketConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Chat memberships for the in-process directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<DirectoryConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketConfig {
    /// Seconds between server pings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval_secs: Option<u64>,
    /// Seconds without inbound traffic before the connection is closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_timeout_secs: Option<u64>,
    /// Frames buffered per connection before sends start failing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound_queue_capacity: Option<usize>,
    /// How long a closing connection may flush its queue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for rolling JSON logs; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryConfig {
    #[serde(default)]
    pub chats: Vec<ChatSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSeed {
    pub id: i64,
    #[serde(default)]
    pub members: Vec<i64>,
}

impl LiimeConfig {
    pub fn host(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.host.as_deref())
            .unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn debug(&self) -> bool {
        self.server.as_ref().and_then(|s| s.debug).unwrap_or(false)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(
            self.websocket
                .as_ref()
                .and_then(|w| w.heartbeat_interval_secs)
                .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_SECS)
                .max(1),
        )
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(
            self.websocket
                .as_ref()
                .and_then(|w| w.ping_timeout_secs)
                .unwrap_or(DEFAULT_PING_TIMEOUT_SECS)
                .max(1),
        )
    }

    pub fn outbound_queue_capacity(&self) -> usize {
        self.websocket
            .as_ref()
            .and_then(|w| w.outbound_queue_capacity)
            .unwrap_or(DEFAULT_OUTBOUND_QUEUE_CAPACITY)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(
            self.websocket
                .as_ref()
                .and_then(|w| w.drain_timeout_ms)
                .unwrap_or(DEFAULT_DRAIN_TIMEOUT_MS),
        )
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.dir.as_deref())
    }

    pub fn chat_seeds(&self) -> &[ChatSeed] {
        self.directory
            .as_ref()
            .map(|d| d.chats.as_slice())
            .unwrap_or(&[])
    }
}
