//! WebSocket entrypoint.
//!
//! Runs the handshake, upgrades HTTP to WS, and hands verified connections to
//! a [`ConnectionSession`]. Also owns the writer task that drains a
//! connection's outbound queue into the socket.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::SplitSink};
use liime_core::Credential;
use liime_logging::redact_sensitive_data;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::auth::{handshake, CLOSE_IDENTITY_INVALID};
use crate::handle::OutboundFrame;
use crate::server::GatewayState;
use crate::session::ConnectionSession;

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// `GET /ws/:user_id[?token=...]`
///
/// On a failed handshake the connection is upgraded and immediately closed
/// with [`CLOSE_IDENTITY_INVALID`]; it is never registered.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(subject): Path<String>,
    Query(query): Query<ConnectQuery>,
    State(state): State<GatewayState>,
) -> Response {
    let mut credential = Credential::new(subject);
    credential.token = query.token;

    let verified = handshake(state.resolver.as_ref(), &credential).await;
    match verified {
        Ok(user) => {
            info!(user = %user, "WebSocket connection authenticated");
            ws.on_upgrade(move |socket| ConnectionSession::run(socket, state, user))
        }
        Err(err) => {
            state.stats.handshake_rejected();
            warn!(
                subject = %redact_sensitive_data(&credential.subject),
                error = %err,
                "WebSocket handshake failed"
            );
            ws.on_upgrade(|mut socket| async move {
                let _ = socket
                    .send(Message::Close(Some(CloseFrame {
                        code: CLOSE_IDENTITY_INVALID,
                        reason: "identity invalid".into(),
                    })))
                    .await;
            })
        }
    }
}

/// Forward queued frames to the socket until the queue closes, a close frame
/// goes out, or the socket fails.
pub(crate) async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<OutboundFrame>,
) {
    while let Some(frame) = rx.recv().await {
        let (msg, last) = match frame {
            OutboundFrame::Text(text) => (Message::Text(text.to_string()), false),
            OutboundFrame::Ping => (Message::Ping(Vec::new()), false),
            OutboundFrame::Pong(data) => (Message::Pong(data), false),
            OutboundFrame::Close { code, reason } => (
                Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                })),
                true,
            ),
        };
        if ws_sender.send(msg).await.is_err() || last {
            break;
        }
    }
}
