//! Message Router.
//!
//! Forwards one event to a caller-supplied recipient list. The router does not
//! know about chats or memberships; group fan-out is resolved before it is
//! called. Offline recipients and failed sends are counted and logged, never
//! returned as errors, and never retried.

use std::collections::HashSet;
use std::sync::Arc;

use liime_core::{RealtimeEvent, UserId};
use liime_logging::{DeliveryEvent, DeliveryEventLogger};
use tracing::error;

use crate::registry::ConnectionRegistry;
use crate::stats::DeliveryStats;
use crate::ws_protocol::ServerFrame;

/// Per-call tally of what happened to each recipient.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouteOutcome {
    pub delivered: usize,
    pub dropped: usize,
    pub failed: usize,
}

pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    stats: Arc<DeliveryStats>,
}

impl MessageRouter {
    pub fn new(registry: Arc<ConnectionRegistry>, stats: Arc<DeliveryStats>) -> Self {
        Self { registry, stats }
    }

    /// Deliver `event` to each distinct recipient that is online right now.
    ///
    /// Sends only enqueue onto the recipient's handle, so two calls for the
    /// same recipient arrive in call order.
    pub fn route(&self, event: &RealtimeEvent, recipients: &[UserId]) -> RouteOutcome {
        let mut outcome = RouteOutcome::default();
        let kind = event.kind();
        let origin = event.origin();

        let text = match ServerFrame::from(event).encode() {
            Ok(text) => text,
            Err(e) => {
                error!(kind = %kind, error = %e, "Failed to encode outbound frame");
                return outcome;
            }
        };

        let mut seen = HashSet::with_capacity(recipients.len());
        for &recipient in recipients {
            if !seen.insert(recipient) {
                continue;
            }

            let Some(handle) = self.registry.lookup(recipient) else {
                outcome.dropped += 1;
                self.stats.dropped_offline();
                DeliveryEventLogger::log_event(origin, DeliveryEvent::Dropped { kind, recipient });
                continue;
            };

            match handle.send_text(Arc::clone(&text)) {
                Ok(()) => {
                    outcome.delivered += 1;
                    self.stats.delivered();
                    DeliveryEventLogger::log_event(origin, DeliveryEvent::Delivered { kind, recipient });
                }
                Err(e) => {
                    // Peer is mid-disconnect or too slow; its own session cleans up.
                    outcome.failed += 1;
                    self.stats.send_failed();
                    DeliveryEventLogger::log_event(
                        origin,
                        DeliveryEvent::SendFailed {
                            kind,
                            recipient,
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }

        outcome
    }
}
