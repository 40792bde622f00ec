//! Outbound side of a live connection.
//!
//! A [`ConnectionHandle`] is a cheap clone of the sending end of one
//! connection's outbound queue. Exactly one writer task drains that queue into
//! the socket, so frames pushed from any task reach the peer whole and in
//! push order.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use liime_core::{TransportError, UserId};
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

/// Process-unique connection identifier; two handles are the same connection
/// iff their ids match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        ConnectionId(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A frame queued for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Pre-encoded JSON, shared between all recipients of a fan-out.
    Text(Arc<str>),
    Ping,
    Pong(Vec<u8>),
    Close { code: u16, reason: String },
}

#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: ConnectionId,
    user: UserId,
    tx: mpsc::Sender<OutboundFrame>,
    closed: AtomicBool,
    close_notify: Notify,
}

impl ConnectionHandle {
    /// Create a handle for `user` and the receiver its writer task drains.
    pub fn new(user: UserId, capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            inner: Arc::new(HandleInner {
                id: ConnectionId::new(),
                user,
                tx,
                closed: AtomicBool::new(false),
                close_notify: Notify::new(),
            }),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn user(&self) -> UserId {
        self.inner.user
    }

    /// Queue a frame without waiting.
    ///
    /// Fails with `Closed` once the handle was closed or the writer is gone,
    /// and with `QueueFull` when the peer is not keeping up.
    pub fn send(&self, frame: OutboundFrame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.inner.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    pub fn send_text(&self, text: Arc<str>) -> Result<(), TransportError> {
        self.send(OutboundFrame::Text(text))
    }

    /// Ask the connection to shut down. Idempotent; only the first call queues
    /// a close frame and wakes the owning session.
    pub fn close(&self, code: u16, reason: impl Into<String>) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.inner.tx.try_send(OutboundFrame::Close {
            code,
            reason: reason.into(),
        });
        self.inner.close_notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire) || self.inner.tx.is_closed()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        self.inner.close_notify.notified().await;
    }

    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        self.inner.id == other.inner.id
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.inner.id)
            .field("user", &self.inner.user)
            .field("closed", &self.is_closed())
            .finish()
    }
}
