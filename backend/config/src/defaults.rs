//! Config defaults: applies default values to parsed config.

use crate::schema::{LiimeConfig, LoggingConfig, ServerConfig, WebSocketConfig};

pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;

pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 1000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: LiimeConfig) -> LiimeConfig {
    let config = apply_server_defaults(config);
    let config = apply_websocket_defaults(config);
    apply_logging_defaults(config)
}

fn apply_server_defaults(mut config: LiimeConfig) -> LiimeConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    if server.host.is_none() {
        server.host = Some(DEFAULT_HOST.to_string());
    }
    if server.port.is_none() {
        server.port = Some(DEFAULT_PORT);
    }
    if server.debug.is_none() {
        server.debug = Some(false);
    }
    config
}

fn apply_websocket_defaults(mut config: LiimeConfig) -> LiimeConfig {
    let ws = config.websocket.get_or_insert_with(WebSocketConfig::default);
    ws.heartbeat_interval_secs.get_or_insert(DEFAULT_HEARTBEAT_INTERVAL_SECS);
    ws.ping_timeout_secs.get_or_insert(DEFAULT_PING_TIMEOUT_SECS);
    ws.outbound_queue_capacity.get_or_insert(DEFAULT_OUTBOUND_QUEUE_CAPACITY);
    ws.drain_timeout_ms.get_or_insert(DEFAULT_DRAIN_TIMEOUT_MS);
    config
}

/// Debug mode lowers the default level; an explicit level always wins.
fn apply_logging_defaults(mut config: LiimeConfig) -> LiimeConfig {
    let debug = config.server.as_ref().and_then(|s| s.debug).unwrap_or(false);
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        let level = if debug { "debug" } else { DEFAULT_LOG_LEVEL };
        logging.level = Some(level.to_string());
    }
    config
}
