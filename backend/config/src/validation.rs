//! Config validation with path-qualified messages.

use crate::schema::LiimeConfig;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &LiimeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_websocket(config, &mut report);
    validate_logging(config, &mut report);
    validate_directory(config, &mut report);
    report
}

fn validate_server(config: &LiimeConfig, report: &mut ValidationReport) {
    let Some(server) = &config.server else { return };
    if let Some(port) = server.port {
        if port < 1024 && port != 80 && port != 443 && port != 0 {
            report.warn(
                "server.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
    if let Some(host) = &server.host {
        if host.trim().is_empty() {
            report.error("server.host", "Host cannot be empty");
        }
    }
}

fn validate_websocket(config: &LiimeConfig, report: &mut ValidationReport) {
    let Some(ws) = &config.websocket else { return };
    if ws.heartbeat_interval_secs == Some(0) {
        report.error("websocket.heartbeatIntervalSecs", "heartbeatIntervalSecs must be >= 1");
    }
    if ws.ping_timeout_secs == Some(0) {
        report.error("websocket.pingTimeoutSecs", "pingTimeoutSecs must be >= 1");
    }
    if ws.outbound_queue_capacity == Some(0) {
        report.error("websocket.outboundQueueCapacity", "outboundQueueCapacity must be >= 1");
    }
    if let (Some(hb), Some(timeout)) = (ws.heartbeat_interval_secs, ws.ping_timeout_secs) {
        if timeout <= hb {
            report.warn(
                "websocket.pingTimeoutSecs",
                format!("pingTimeoutSecs ({timeout}) should exceed heartbeatIntervalSecs ({hb}); idle peers will be dropped before they can answer a ping"),
            );
        }
    }
}

fn validate_logging(config: &LiimeConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    // Anything else is treated as an EnvFilter directive and left alone.
    if level.trim().is_empty() {
        report.error("logging.level", "Log level cannot be empty");
    }
}

fn validate_directory(config: &LiimeConfig, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for (i, chat) in config.chat_seeds().iter().enumerate() {
        if !seen.insert(chat.id) {
            report.error(format!("directory.chats[{i}].id"), format!("Duplicate chat id {}", chat.id));
        }
        if chat.members.is_empty() {
            report.warn(format!("directory.chats[{i}].members"), "Chat has no members");
        }
    }
}
