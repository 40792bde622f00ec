//! Liime real-time gateway.
//!
//! Tracks live connections, broadcasts presence, and routes chat messages and
//! signals between connected users over WebSocket.

pub mod auth;
pub mod handle;
pub mod health_api;
pub mod presence;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod stats;
pub mod ws_protocol;
pub mod ws_server;

pub use auth::PathIdentityResolver;
pub use handle::{ConnectionHandle, ConnectionId, OutboundFrame};
pub use presence::{AttachOutcome, PresenceTracker};
pub use registry::ConnectionRegistry;
pub use router::{MessageRouter, RouteOutcome};
pub use server::{build_router, serve, GatewayState, SessionSettings};
pub use session::{ConnectionSession, SessionState};
pub use stats::{DeliveryStats, DeliveryStatsSnapshot};
