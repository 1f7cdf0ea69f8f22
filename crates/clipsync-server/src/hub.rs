//! Relay protocol handler: the per-connection lifecycle.
//!
//! A connection moves through handshake (token check, metadata
//! validation), registration (session directory upsert, group join,
//! `DeviceConnected` broadcast), the steady-state message loop, and a
//! cleanup that always runs when the transport goes away, however it
//! goes away.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use clipsync_shared::protocol::{ClientMessage, ServerMessage};
use clipsync_shared::types::{DeviceClass, EventId, UserId};
use clipsync_store::{ClipboardEvent, CommandEvent, Device, Event};

use crate::api::AppState;
use crate::error::ServerError;
use crate::groups::ConnectionId;

/// Connect-time parameters, carried as query fields like the REST
/// surface carries JSON bodies.
#[derive(Debug, Deserialize)]
pub struct Handshake {
    pub access_token: String,
    pub device_name: String,
    pub device_class: u8,
    pub device_identifier: String,
}

/// `GET /sync`: authenticate, validate the handshake, then hand the
/// socket to the connection loop.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(handshake): Query<Handshake>,
    ws: WebSocketUpgrade,
) -> Result<Response, ServerError> {
    let Some(user) = state.tokens.authenticate(&handshake.access_token)? else {
        return Err(ServerError::Unauthorized("Invalid or expired token".to_string()));
    };

    let class = DeviceClass::from_u8(handshake.device_class)
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    if handshake.device_name.trim().is_empty() {
        return Err(ServerError::BadRequest("Device name is required".to_string()));
    }
    if handshake.device_identifier.trim().is_empty() {
        return Err(ServerError::BadRequest(
            "Device identifier is required".to_string(),
        ));
    }

    let name = handshake.device_name.trim().to_string();
    let identifier = handshake.device_identifier.trim().to_string();

    Ok(ws.on_upgrade(move |socket| run_connection(state, socket, user, name, class, identifier)))
}

/// Registration: directory record first, then group membership, then
/// the arrival broadcast. Informational, so no exclusion: the
/// registering device sees its own arrival too.
pub(crate) async fn register_connection(
    state: &AppState,
    user: UserId,
    conn: ConnectionId,
    sender: mpsc::Sender<ServerMessage>,
    name: &str,
    class: DeviceClass,
    identifier: &str,
) -> clipsync_store::Result<Device> {
    let device = state.sessions.upsert(user, identifier, name, class)?;
    state.groups.join(user, conn, sender).await;
    state
        .groups
        .broadcast(
            user,
            ServerMessage::DeviceConnected {
                device_id: device.id,
                device_name: device.name.clone(),
            },
            None,
        )
        .await;
    Ok(device)
}

/// Cleanup mirror of [`register_connection`], run on every exit path.
pub(crate) async fn unregister_connection(
    state: &AppState,
    user: UserId,
    conn: ConnectionId,
    identifier: &str,
) {
    state.groups.leave(user, conn).await;
    if let Err(e) = state.sessions.mark_disconnected(user, identifier) {
        warn!(user = %user, error = %e, "Failed to mark device disconnected");
    }
    state
        .groups
        .broadcast(
            user,
            ServerMessage::DeviceDisconnected {
                device_identifier: identifier.to_string(),
            },
            None,
        )
        .await;
}

/// Drive one registered connection until its transport closes.
async fn run_connection(
    state: AppState,
    socket: WebSocket,
    user: UserId,
    device_name: String,
    class: DeviceClass,
    identifier: String,
) {
    let conn_id: ConnectionId = Uuid::new_v4();
    let (out_tx, mut out_rx) = mpsc::channel(state.config.connection_queue_depth);

    let device = match register_connection(
        &state,
        user,
        conn_id,
        out_tx,
        &device_name,
        class,
        &identifier,
    )
    .await
    {
        Ok(device) => device,
        Err(e) => {
            warn!(user = %user, error = %e, "Device registration failed, closing");
            return;
        }
    };

    info!(user = %user, device = %device.id, conn = %conn_id, "Device connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match ClientMessage::decode(&text) {
                            Ok(msg) => {
                                if let Some(reply) = handle_submission(&state, user, conn_id, msg).await {
                                    let Ok(encoded) = reply.encode() else { continue };
                                    if ws_tx.send(Message::Text(encoded)).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                warn!(user = %user, conn = %conn_id, error = %e, "Undecodable client message");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if ws_tx.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(user = %user, conn = %conn_id, error = %e, "Transport error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }

            outbound = out_rx.recv() => {
                match outbound {
                    Some(msg) => {
                        let Ok(encoded) = msg.encode() else { continue };
                        if ws_tx.send(Message::Text(encoded)).await.is_err() {
                            break;
                        }
                    }
                    // Sender side pruned by the router.
                    None => break,
                }
            }
        }
    }

    // Cleanup runs on every exit path above, clean close and transport
    // error alike.
    unregister_connection(&state, user, conn_id, &identifier).await;
    info!(user = %user, conn = %conn_id, "Device disconnected");
}

/// Process one client submission. Returns a message for the submitting
/// connection only (currently just store-failure rejections); group
/// traffic goes through the router.
pub(crate) async fn handle_submission(
    state: &AppState,
    user: UserId,
    conn: ConnectionId,
    msg: ClientMessage,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::SubmitClipboard { content, kind } => {
            if content.is_empty() {
                warn!(user = %user, conn = %conn, "Dropping empty clipboard submission");
                return None;
            }
            let max = state.config.max_payload_bytes;
            if content.len() > max {
                warn!(
                    user = %user,
                    conn = %conn,
                    size = content.len(),
                    max,
                    "Dropping oversized clipboard submission"
                );
                return None;
            }

            let event = Event::Clipboard(ClipboardEvent {
                id: EventId::new(),
                user_id: user,
                content: content.clone(),
                kind,
                created_at: Utc::now(),
            });

            let event_id = match state.events.append(&event) {
                Ok(id) => id,
                Err(e) => {
                    warn!(user = %user, error = %e, "Clipboard submission rejected by store");
                    return Some(ServerMessage::Error {
                        message: "Submission rejected, try again".to_string(),
                    });
                }
            };

            state
                .groups
                .broadcast(
                    user,
                    ServerMessage::ReceiveClipboard {
                        event_id,
                        content,
                        kind,
                    },
                    Some(conn),
                )
                .await;
            None
        }

        ClientMessage::SubmitCommand {
            target_device_id,
            kind,
            payload,
        } => {
            if let Some(p) = &payload {
                if p.len() > state.config.max_payload_bytes {
                    warn!(user = %user, conn = %conn, "Dropping oversized command payload");
                    return None;
                }
            }

            let event = Event::Command(CommandEvent {
                id: EventId::new(),
                user_id: user,
                target_device_id,
                kind,
                payload: payload.clone(),
                created_at: Utc::now(),
            });

            let event_id = match state.events.append(&event) {
                Ok(id) => id,
                Err(e) => {
                    warn!(user = %user, error = %e, "Command submission rejected by store");
                    return Some(ServerMessage::Error {
                        message: "Submission rejected, try again".to_string(),
                    });
                }
            };

            // Commands go to the whole group; the targeted device acts,
            // the rest ignore by id mismatch.
            state
                .groups
                .broadcast(
                    user,
                    ServerMessage::ReceiveCommand {
                        event_id,
                        target_device_id,
                        kind,
                        payload,
                    },
                    None,
                )
                .await;
            None
        }
    }
}
