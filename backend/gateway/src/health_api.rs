//! Health and presence query endpoints.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use liime_core::UserId;
use serde::Serialize;

use crate::server::GatewayState;
use crate::stats::DeliveryStatsSnapshot;

pub const SERVICE_NAME: &str = "Liime Messenger Server";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub online: usize,
    pub delivery: DeliveryStatsSnapshot,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OnlineUsers {
    pub online_users: Vec<UserId>,
}

/// Handler for `GET /health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "healthy",
        version: VERSION,
        uptime_seconds: state.started_at.elapsed().as_secs(),
        online: state.registry.len(),
        delivery: state.stats.snapshot(),
        timestamp: Utc::now(),
    })
}

/// Handler for `GET /`
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: SERVICE_NAME,
        version: VERSION,
        status: "running",
    })
}

/// Handler for `GET /api/users/online`
pub async fn online_users(State(state): State<GatewayState>) -> Json<OnlineUsers> {
    let mut online_users: Vec<UserId> = state.registry.snapshot().into_iter().collect();
    online_users.sort();
    Json(OnlineUsers { online_users })
}
