//! Delivery Event Logger
//!
//! One structured record per routing outcome, emitted under the
//! `delivery_events` target so it can be filtered or shipped separately.

use chrono::{DateTime, Utc};
use liime_core::{EventKind, UserId};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryEvent {
    Delivered {
        kind: EventKind,
        recipient: UserId,
    },
    /// Recipient offline. Normal outcome, not a failure.
    Dropped {
        kind: EventKind,
        recipient: UserId,
    },
    SendFailed {
        kind: EventKind,
        recipient: UserId,
        reason: String,
    },
    MalformedFrame {
        error: String,
    },
}

#[derive(Debug, Serialize)]
pub struct DeliveryLogEntry {
    pub origin: UserId,
    pub timestamp: DateTime<Utc>,
    pub event: DeliveryEvent,
}

pub struct DeliveryEventLogger;

impl DeliveryEventLogger {
    pub fn log_event(origin: UserId, event: DeliveryEvent) {
        let failed = matches!(
            event,
            DeliveryEvent::SendFailed { .. } | DeliveryEvent::MalformedFrame { .. }
        );
        let entry = DeliveryLogEntry {
            origin,
            timestamp: Utc::now(),
            event,
        };

        if failed {
            warn!(target: "delivery_events", event = ?entry, "Delivery event");
        } else {
            debug!(target: "delivery_events", event = ?entry, "Delivery event");
        }
    }
}
