//! Per-connection session.
//!
//! `Connecting -> Active -> Closing -> Closed`. `Connecting` (the handshake)
//! happens in [`crate::ws_server`] before the socket is handed over; a session
//! only exists for connections with a verified identity.
//!
//! Cleanup (guarded unregister plus the offline broadcast) lives in a drop
//! guard owned by the session task, so it runs exactly once however the task
//! ends: clean close, transport error, supersession, panic, or abort.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::StreamExt;
use liime_core::{ChatId, RealtimeEvent, UserId};
use liime_logging::{DeliveryEvent, DeliveryEventLogger};
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::handle::{ConnectionHandle, OutboundFrame};
use crate::presence::{AttachOutcome, PresenceTracker};
use crate::server::GatewayState;
use crate::stats::DeliveryStats;
use crate::ws_protocol::{ClientFrame, ServerFrame};
use crate::ws_server::writer_task;

/// Close code for a normal, server-initiated close.
const CLOSE_NORMAL: u16 = 1000;
/// Close code when the peer stopped answering pings.
const CLOSE_GOING_AWAY: u16 = 1001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

/// Why the receive loop stopped.
#[derive(Debug)]
enum ExitReason {
    PeerClosed,
    StreamEnded,
    Transport,
    IdleTimeout,
    ClosedByServer,
}

pub struct ConnectionSession {
    user: UserId,
    handle: ConnectionHandle,
    state: SessionState,
    gateway: GatewayState,
}

/// Runs the `Closed` transition when dropped.
struct CleanupGuard {
    user: UserId,
    handle: ConnectionHandle,
    presence: Arc<PresenceTracker>,
    stats: Arc<DeliveryStats>,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let went_offline = self.presence.detach(self.user, &self.handle);
        self.stats.connection_closed();
        info!(
            user = %self.user,
            conn_id = %self.handle.id(),
            superseded = !went_offline,
            "Session closed"
        );
    }
}

impl ConnectionSession {
    /// Drive an authenticated socket until it closes.
    pub async fn run(socket: WebSocket, gateway: GatewayState, user: UserId) {
        let settings = gateway.settings;
        let (ws_sender, mut ws_receiver) = socket.split();
        let (handle, rx) = ConnectionHandle::new(user, settings.queue_capacity);

        let mut session = ConnectionSession {
            user,
            handle: handle.clone(),
            state: SessionState::Connecting,
            gateway,
        };

        let mut writer = tokio::spawn(writer_task(ws_sender, rx));

        session.gateway.stats.connection_opened();
        let outcome = session.gateway.presence.attach(user, handle.clone());
        let _guard = CleanupGuard {
            user,
            handle: handle.clone(),
            presence: Arc::clone(&session.gateway.presence),
            stats: Arc::clone(&session.gateway.stats),
        };
        session.transition(SessionState::Active);
        info!(
            user = %user,
            conn_id = %handle.id(),
            replaced_existing = matches!(outcome, AttachOutcome::Superseded(_)),
            "Session active"
        );

        let reason = session.receive_loop(&mut ws_receiver).await;
        session.transition(SessionState::Closing);
        info!(user = %user, conn_id = %handle.id(), reason = ?reason, "Session closing");

        match reason {
            ExitReason::IdleTimeout => handle.close(CLOSE_GOING_AWAY, "ping timeout"),
            _ => handle.close(CLOSE_NORMAL, ""),
        }
        drop(ws_receiver);

        // Let queued frames (and our close frame) flush, but not forever.
        if timeout(settings.drain_timeout, &mut writer).await.is_err() {
            debug!(user = %user, "Outbound drain timed out");
            writer.abort();
        }

        session.transition(SessionState::Closed);
        // _guard drops here: detach + offline broadcast unless superseded.
    }

    fn transition(&mut self, next: SessionState) {
        debug!(user = %self.user, from = ?self.state, to = ?next, "Session state");
        self.state = next;
    }

    async fn receive_loop<S>(&mut self, ws_receiver: &mut S) -> ExitReason
    where
        S: futures::Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        let settings = self.gateway.settings;
        let mut heartbeat = interval(settings.heartbeat_period());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately.
        heartbeat.tick().await;
        let mut last_inbound = Instant::now();

        loop {
            tokio::select! {
                biased;

                _ = self.handle.closed() => return ExitReason::ClosedByServer,

                msg = ws_receiver.next() => {
                    let msg = match msg {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => {
                            warn!(user = %self.user, error = %e, "WebSocket receive error");
                            return ExitReason::Transport;
                        }
                        None => return ExitReason::StreamEnded,
                    };
                    last_inbound = Instant::now();

                    match msg {
                        Message::Text(text) => {
                            self.gateway.stats.frame_received();
                            self.dispatch(&text).await;
                        }
                        Message::Binary(data) => {
                            debug!(user = %self.user, len = data.len(), "Ignoring binary frame");
                        }
                        Message::Ping(data) => {
                            let _ = self.handle.send(OutboundFrame::Pong(data));
                        }
                        Message::Pong(_) => {}
                        Message::Close(frame) => {
                            debug!(user = %self.user, frame = ?frame, "Client initiated close");
                            return ExitReason::PeerClosed;
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    if last_inbound.elapsed() >= settings.ping_timeout {
                        warn!(user = %self.user, idle = ?last_inbound.elapsed(), "Ping timeout, closing connection");
                        return ExitReason::IdleTimeout;
                    }
                    if let Err(e) = self.handle.send(OutboundFrame::Ping) {
                        debug!(user = %self.user, error = %e, "Heartbeat not queued");
                    }
                }
            }
        }
    }

    /// Decode one inbound frame and hand it on. Malformed frames are dropped
    /// here; they never end the session.
    async fn dispatch(&self, text: &str) {
        let frame = match ClientFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.gateway.stats.frame_malformed();
                DeliveryEventLogger::log_event(
                    self.user,
                    DeliveryEvent::MalformedFrame { error: e.to_string() },
                );
                return;
            }
        };

        let router = &self.gateway.router;
        match frame {
            ClientFrame::Message {
                recipient_id,
                chat_id,
                content,
            } => {
                let recipients = self.chat_recipients(chat_id, recipient_id).await;
                let event = RealtimeEvent::chat_message(chat_id, self.user, recipient_id, content);
                router.route(&event, &recipients);
            }
            ClientFrame::Typing { recipient_id } => {
                let event = RealtimeEvent::TypingSignal {
                    sender: self.user,
                    recipient: recipient_id,
                };
                router.route(&event, &[recipient_id]);
            }
            ClientFrame::Read { chat_id } => {
                let event = RealtimeEvent::ReadReceipt {
                    chat_id,
                    sender: self.user,
                };
                router.route(&event, &[self.user]);
            }
            ClientFrame::Ping => {
                if let Ok(text) = ServerFrame::Pong.encode() {
                    let _ = self.handle.send_text(text);
                }
            }
        }
    }

    /// Group chats (more than two members) fan out to every member but the
    /// sender; anything else goes to the addressed recipient.
    async fn chat_recipients(&self, chat_id: ChatId, recipient_id: UserId) -> Vec<UserId> {
        match self.gateway.directory.list_chat_members(chat_id).await {
            Ok(members) if members.len() > 2 => {
                let mut recipients: Vec<UserId> =
                    members.into_iter().filter(|m| *m != self.user).collect();
                recipients.sort();
                recipients
            }
            Ok(_) => vec![recipient_id],
            Err(e) => {
                debug!(chat_id = %chat_id, error = %e, "No membership; using addressed recipient");
                vec![recipient_id]
            }
        }
    }
}
