//! Presence tracking and status broadcast.
//!
//! Every registry mutation that can change a user's online state goes through
//! [`PresenceTracker::attach`] or [`PresenceTracker::detach`]. Both run under
//! one transition lock, so the status broadcasts for a user leave in the same
//! order as the mutations that caused them, and a repeat of the last broadcast
//! state is suppressed.
//!
//! Broadcasts only enqueue onto handles (no socket I/O), which is what makes
//! holding the transition lock across the fan-out acceptable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use liime_core::{ChatDirectory, RealtimeEvent, UserId};
use tracing::{debug, error, info, warn};

use crate::handle::ConnectionHandle;
use crate::registry::ConnectionRegistry;
use crate::stats::DeliveryStats;
use crate::ws_protocol::ServerFrame;

/// WebSocket close code sent to a connection replaced by a newer one.
pub const CLOSE_SUPERSEDED: u16 = 4000;

#[derive(Debug)]
pub enum AttachOutcome {
    /// First live connection for the user; an online status went out.
    Online,
    /// Replaced an existing connection, which has been closed. No status
    /// change was broadcast.
    Superseded(ConnectionHandle),
}

pub struct PresenceTracker {
    registry: Arc<ConnectionRegistry>,
    stats: Arc<DeliveryStats>,
    directory: Option<Arc<dyn ChatDirectory>>,
    /// Last broadcast state per user; absent means offline.
    announced: Mutex<HashMap<UserId, bool>>,
}

impl PresenceTracker {
    pub fn new(registry: Arc<ConnectionRegistry>, stats: Arc<DeliveryStats>) -> Self {
        Self {
            registry,
            stats,
            directory: None,
            announced: Mutex::new(HashMap::new()),
        }
    }

    /// Also forward transitions to the persistence collaborator.
    pub fn with_directory(mut self, directory: Arc<dyn ChatDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Register `handle` as `user`'s live connection.
    pub fn attach(&self, user: UserId, handle: ConnectionHandle) -> AttachOutcome {
        let mut announced = self.announced.lock().unwrap_or_else(PoisonError::into_inner);

        match self.registry.register(user, handle) {
            Some(previous) => {
                self.stats.superseded();
                info!(user = %user, stale_conn = %previous.id(), "Connection superseded");
                previous.close(CLOSE_SUPERSEDED, "superseded");
                AttachOutcome::Superseded(previous)
            }
            None => {
                self.transition(&mut announced, user, true);
                AttachOutcome::Online
            }
        }
    }

    /// Remove `handle` if it is still `user`'s live connection.
    ///
    /// Returns `false` for a superseded handle; nothing is broadcast then.
    pub fn detach(&self, user: UserId, handle: &ConnectionHandle) -> bool {
        let mut announced = self.announced.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.registry.unregister(user, handle) {
            debug!(user = %user, conn_id = %handle.id(), "Stale connection detached silently");
            return false;
        }
        self.transition(&mut announced, user, false);
        true
    }

    fn transition(&self, announced: &mut HashMap<UserId, bool>, user: UserId, is_online: bool) {
        let was_online = announced.get(&user).copied().unwrap_or(false);
        if was_online == is_online {
            debug!(user = %user, is_online, "Duplicate presence transition suppressed");
            return;
        }

        if is_online {
            announced.insert(user, true);
            self.on_connect(user);
        } else {
            announced.remove(&user);
            self.on_disconnect(user);
        }
    }

    /// Announce `user` as online to every connection.
    pub fn on_connect(&self, user: UserId) {
        info!(user = %user, "User online");
        self.announce(user, true);
    }

    /// Announce `user` as offline to every remaining connection.
    pub fn on_disconnect(&self, user: UserId) {
        info!(user = %user, "User offline");
        self.announce(user, false);
    }

    fn announce(&self, user: UserId, is_online: bool) {
        self.broadcast(&RealtimeEvent::StatusChange { user, is_online });
        self.persist(user, is_online);
    }

    /// Best-effort fan-out over a snapshot of live handles. Returns how many
    /// connections accepted the frame.
    pub fn broadcast(&self, event: &RealtimeEvent) -> usize {
        let text = match ServerFrame::from(event).encode() {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to encode broadcast frame");
                return 0;
            }
        };

        self.stats.status_broadcast();
        let mut sent = 0;
        for handle in self.registry.handles() {
            match handle.send_text(Arc::clone(&text)) {
                Ok(()) => sent += 1,
                Err(e) => {
                    // Left to that connection's own lifecycle.
                    self.stats.send_failed();
                    warn!(user = %handle.user(), conn_id = %handle.id(), error = %e, "Broadcast send failed");
                }
            }
        }
        sent
    }

    fn persist(&self, user: UserId, is_online: bool) {
        let Some(directory) = self.directory.clone() else { return };
        // Cleanup may run from a drop guard after the runtime is gone.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(user = %user, "No runtime; skipping presence write");
            return;
        };
        runtime.spawn(async move {
            if let Err(e) = directory.set_online_status(user, is_online).await {
                warn!(user = %user, is_online, error = %e, "Failed to store presence");
            }
        });
    }
}
