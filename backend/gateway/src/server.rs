//! HTTP/WebSocket server wiring.

use anyhow::Result;
use axum::{routing::get, Router};
use liime_config::LiimeConfig;
use liime_core::{ChatDirectory, IdentityResolver};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use crate::health_api;
use crate::presence::PresenceTracker;
use crate::registry::ConnectionRegistry;
use crate::router::MessageRouter;
use crate::stats::DeliveryStats;
use crate::ws_server;

/// Per-connection timing and buffering.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub heartbeat_interval: Duration,
    pub ping_timeout: Duration,
    pub queue_capacity: usize,
    pub drain_timeout: Duration,
}

/// Floor for the heartbeat period; `tokio::time::interval` rejects zero.
const MIN_HEARTBEAT_PERIOD: Duration = Duration::from_millis(10);

impl SessionSettings {
    pub fn heartbeat_period(&self) -> Duration {
        self.heartbeat_interval.max(MIN_HEARTBEAT_PERIOD)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&LiimeConfig::default())
    }
}

impl From<&LiimeConfig> for SessionSettings {
    fn from(config: &LiimeConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            ping_timeout: config.ping_timeout(),
            queue_capacity: config.outbound_queue_capacity(),
            drain_timeout: config.drain_timeout(),
        }
    }
}

/// Application state shared across routes and sessions.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<ConnectionRegistry>,
    pub presence: Arc<PresenceTracker>,
    pub router: Arc<MessageRouter>,
    pub stats: Arc<DeliveryStats>,
    pub resolver: Arc<dyn IdentityResolver>,
    pub directory: Arc<dyn ChatDirectory>,
    pub settings: SessionSettings,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(
        resolver: Arc<dyn IdentityResolver>,
        directory: Arc<dyn ChatDirectory>,
        settings: SessionSettings,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let stats = Arc::new(DeliveryStats::new());
        let presence = Arc::new(
            PresenceTracker::new(Arc::clone(&registry), Arc::clone(&stats))
                .with_directory(Arc::clone(&directory)),
        );
        let router = Arc::new(MessageRouter::new(Arc::clone(&registry), Arc::clone(&stats)));

        Self {
            registry,
            presence,
            router,
            stats,
            resolver,
            directory,
            settings,
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_api::root))
        .route("/health", get(health_api::get_health))
        .route("/api/users/online", get(health_api::online_users))
        .route("/ws/:user_id", get(ws_server::ws_handler))
        .with_state(state)
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use liime_config::schema::WebSocketConfig;

    #[test]
    fn test_settings_from_config() {
        let mut config = LiimeConfig::default();
        config.websocket = Some(WebSocketConfig {
            heartbeat_interval_secs: Some(0),
            ping_timeout_secs: Some(0),
            outbound_queue_capacity: Some(8),
            drain_timeout_ms: Some(250),
        });
        let settings = SessionSettings::from(&config);

        assert_eq!(settings.heartbeat_interval, Duration::from_secs(1));
        assert_eq!(settings.ping_timeout, Duration::from_secs(1));
        assert_eq!(settings.queue_capacity, 8);
        assert_eq!(settings.drain_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_heartbeat_is_floored() {
        let settings = SessionSettings {
            heartbeat_interval: Duration::ZERO,
            ..SessionSettings::default()
        };
        assert_eq!(settings.heartbeat_period(), MIN_HEARTBEAT_PERIOD);

        let settings = SessionSettings::default();
        assert_eq!(settings.heartbeat_period(), Duration::from_secs(30));
    }
}
