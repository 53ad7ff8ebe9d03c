//! WebSocket transports: SockJS-framed and raw.
//!
//! DESIGN
//! ======
//! On upgrade the handler binds a consumer to the session and enters a
//! `select!` loop:
//! - Chunks written by the session → forwarded as text messages
//! - Text messages from the client → delivered to the session
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → attach (the session writes `o`, or a close frame if it is
//!    unavailable)
//! 2. Frames flow both ways until one side stops
//! 3. Session released the consumer → send a close message carrying the
//!    session's close status (or the 2010 rejection for a second socket)
//! 4. Client went away → the attachment drops and the session closes with
//!    `1002 Connection interrupted`
//!
//! A SockJS-framed text message that is not valid JSON drops the socket
//! without a close message.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::http::session_key;
use crate::error::SockJsError;
use crate::session::{Attachment, Session};
use crate::state::AppState;
use crate::transport::{Transport, TransportKind};

const NORMAL_CLOSURE: u16 = 1000;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_websocket(
    State(state): State<AppState>,
    Path((server, session)): Path<(String, String)>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(key) = session_key(&server, &session) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    upgrade(state, ws, key, TransportKind::WebSocket)
}

/// Raw websocket: no framing, a fresh server-generated session per socket.
pub async fn handle_raw_websocket(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    upgrade(state, ws, Uuid::new_v4().to_string(), TransportKind::RawWebSocket)
}

fn upgrade(
    state: AppState,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    key: String,
    kind: TransportKind,
) -> Response {
    if !state.config.websocket {
        return SockJsError::WebSocketDisabled.into_response();
    }
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            debug!(error = %rejection, "ws: upgrade rejected");
            return SockJsError::BadUpgrade.into_response();
        }
    };
    let transport = match Transport::new(kind, None) {
        Ok(transport) => transport,
        Err(error) => return error.into_response(),
    };
    ws.on_upgrade(move |socket| run_ws(socket, state, key, transport))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, key: String, transport: Transport) {
    let kind = transport.kind();
    let mut attachment = state.registry.handle_open_request(&key, transport);
    info!(session = %key, transport = kind.name(), "ws: client connected");

    loop {
        tokio::select! {
            chunk = attachment.next_chunk() => {
                let Some(chunk) = chunk else {
                    send_close(&mut socket, &attachment).await;
                    break;
                };
                if socket.send(Message::Text(chunk.into())).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        match deliver(attachment.session(), kind, text.as_str()) {
                            Ok(()) => {}
                            Err(SockJsError::InvalidJson) => {
                                warn!(session = %key, "ws: broken json, dropping socket");
                                break;
                            }
                            Err(error) => {
                                debug!(session = %key, %error, "ws: inbound rejected");
                                break;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    info!(session = %key, "ws: connection ended");
    // Dropping the attachment reports the peer as gone if still bound.
    drop(attachment);
}

fn deliver(session: &Session, kind: TransportKind, text: &str) -> Result<(), SockJsError> {
    match kind {
        TransportKind::RawWebSocket => session.receive_text(text),
        // Empty frames are keep-alives from some clients.
        _ if text.is_empty() => Ok(()),
        _ => session.receive_message(text),
    }
}

/// Close the socket with the status this consumer was rejected with, or
/// else the session's close status.
///
/// Codes outside the websocket application range (3000-4999) are sent as a
/// normal closure with the same reason.
async fn send_close(socket: &mut WebSocket, attachment: &Attachment) {
    let status = attachment
        .rejection()
        .cloned()
        .or_else(|| attachment.session().close_status());
    let frame = status.map(|status| CloseFrame {
        code: if (3000..5000).contains(&status.code) { status.code } else { NORMAL_CLOSURE },
        reason: status.reason.into(),
    });
    // The peer may already be gone.
    let _ = socket.send(Message::Close(frame)).await;
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
