//! Connection driver: one WebSocket session at a time, reconnected
//! with bounded backoff.
//!
//! All retry scheduling lives here, in one loop, with the policy
//! injected through [`ClientConfig`]. The embedding application talks
//! to the driver through a [`ConnectionHandle`] for submissions and an
//! mpsc receiver of [`SyncEvent`]s for everything the relay pushes.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use clipsync_shared::protocol::{ClientMessage, ServerMessage};
use clipsync_shared::types::{ClipboardKind, CommandKind, DeviceId, EventId};

use crate::backoff::ReconnectSchedule;
use crate::cipher::ContentCipher;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::gate::PayloadGate;
use crate::suppress::LocalClipboard;

/// What the driver reports to the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Connected,
    Reconnecting { attempt: u32, delay: Duration },
    GaveUp,
    ClipboardReceived {
        event_id: EventId,
        content: String,
        kind: ClipboardKind,
    },
    CommandReceived {
        event_id: EventId,
        target_device_id: DeviceId,
        kind: CommandKind,
        payload: Option<String>,
    },
    DeviceConnected {
        device_id: DeviceId,
        device_name: String,
    },
    DeviceDisconnected {
        device_identifier: String,
    },
    ServerError {
        message: String,
    },
}

struct Shared {
    gate: PayloadGate,
    cipher: Option<ContentCipher>,
    clipboard: Mutex<LocalClipboard>,
    submit_tx: mpsc::Sender<ClientMessage>,
}

/// Cloneable submission surface, shared by the application and the
/// clipboard watcher.
#[derive(Clone)]
pub struct ConnectionHandle {
    shared: Arc<Shared>,
}

impl ConnectionHandle {
    /// Submit clipboard content. Returns whether the submission was
    /// queued; gated-out content is dropped with a log.
    pub async fn submit_clipboard(&self, content: &str, kind: ClipboardKind) -> bool {
        if !self.shared.gate.admit_outbound(content) {
            return false;
        }

        self.shared
            .clipboard
            .lock()
            .await
            .note_submitted(content, kind);

        let wire_content = match &self.shared.cipher {
            Some(cipher) => cipher.protect(content),
            None => content.to_string(),
        };

        self.shared
            .submit_tx
            .send(ClientMessage::SubmitClipboard {
                content: wire_content,
                kind,
            })
            .await
            .is_ok()
    }

    /// Submit a remote command for one of the user's other devices.
    pub async fn submit_command(
        &self,
        target_device_id: DeviceId,
        kind: CommandKind,
        payload: Option<String>,
    ) -> bool {
        self.shared
            .submit_tx
            .send(ClientMessage::SubmitCommand {
                target_device_id,
                kind,
                payload,
            })
            .await
            .is_ok()
    }

    /// Poll entry point: submit the current clipboard value if it is a
    /// genuine local change. The change check and the submission share
    /// the clipboard owner, so an inbound apply between the two cannot
    /// sneak in a false change.
    pub async fn poll_clipboard(&self, current: &str) -> bool {
        let changed = self.shared.clipboard.lock().await.detect_change(current);
        match changed {
            Some(content) => self.submit_clipboard(&content, ClipboardKind::Text).await,
            None => false,
        }
    }
}

pub struct Connection {
    config: ClientConfig,
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<SyncEvent>,
    pub(crate) submit_rx: mpsc::Receiver<ClientMessage>,
}

impl Connection {
    /// Build a driver. Returns the driver itself (run it with
    /// [`Connection::run`]), the submission handle, and the event
    /// stream.
    pub fn new(
        config: ClientConfig,
        cipher: Option<ContentCipher>,
    ) -> (Self, ConnectionHandle, mpsc::Receiver<SyncEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (submit_tx, submit_rx) = mpsc::channel(64);

        let shared = Arc::new(Shared {
            gate: PayloadGate::new(config.max_transfer_bytes, config.max_local_bytes),
            cipher,
            clipboard: Mutex::new(LocalClipboard::new()),
            submit_tx,
        });

        let handle = ConnectionHandle {
            shared: shared.clone(),
        };
        let connection = Self {
            config,
            shared,
            event_tx,
            submit_rx,
        };
        (connection, handle, event_rx)
    }

    /// Drive the connection until the server rejects the handshake or
    /// the reconnect ceiling is reached. A session that reaches the
    /// relay resets the backoff schedule, so a later failure starts
    /// over at the initial delay.
    pub async fn run(mut self) -> Result<(), ClientError> {
        let mut schedule = ReconnectSchedule::new(self.config.reconnect);

        loop {
            match self.run_session(&mut schedule).await {
                Ok(()) => debug!("Session closed, scheduling reconnect"),
                Err(ClientError::HandshakeRejected(reason)) => {
                    warn!(reason = %reason, "Handshake rejected, not retrying");
                    return Err(ClientError::HandshakeRejected(reason));
                }
                Err(e) => debug!(error = %e, "Session failed, scheduling reconnect"),
            }

            // One-shot flags do not survive a connection.
            self.shared.clipboard.lock().await.reset_on_close();

            match schedule.next_delay() {
                Some(delay) => {
                    let attempt = schedule.attempts();
                    info!(attempt, delay_secs = delay.as_secs(), "Reconnecting");
                    let _ = self
                        .event_tx
                        .send(SyncEvent::Reconnecting { attempt, delay })
                        .await;
                    tokio::time::sleep(delay).await;
                }
                None => {
                    let attempts = schedule.attempts();
                    warn!(attempts, "Giving up on reconnection");
                    let _ = self.event_tx.send(SyncEvent::GaveUp).await;
                    return Err(ClientError::GaveUp { attempts });
                }
            }
        }
    }

    /// One connected session, from dial to close.
    async fn run_session(&mut self, schedule: &mut ReconnectSchedule) -> Result<(), ClientError> {
        let url = self.config.sync_url();
        let (ws, _) = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok(ok) => ok,
            Err(WsError::Http(response)) => {
                // Rejected before upgrade: bad token or bad metadata.
                return Err(ClientError::HandshakeRejected(format!(
                    "HTTP {}",
                    response.status()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        info!(device = %self.config.device_name, "Connected to relay");
        schedule.record_success();
        let _ = self.event_tx.send(SyncEvent::Connected).await;

        let (mut ws_tx, mut ws_rx) = ws.split();

        loop {
            tokio::select! {
                inbound = ws_rx.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            match ServerMessage::decode(&text) {
                                Ok(msg) => self.apply_inbound(msg).await,
                                Err(e) => {
                                    warn!(error = %e, "Undecodable server message");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            if ws_tx.send(Message::Pong(payload)).await.is_err() {
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return Ok(()),
                        Some(Err(e)) => return Err(e.into()),
                        Some(Ok(_)) => {}
                    }
                }

                submission = self.submit_rx.recv() => {
                    let Some(msg) = submission else { return Ok(()) };
                    let encoded = msg.encode()?;
                    ws_tx.send(Message::Text(encoded)).await?;
                }
            }
        }
    }

    /// Apply one relay event: decrypt, gate, suppress, then surface.
    pub(crate) async fn apply_inbound(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::ReceiveClipboard {
                event_id,
                content,
                kind,
            } => {
                let content = match &self.shared.cipher {
                    Some(cipher) => cipher.recover(&content),
                    None => content,
                };
                if !self.shared.gate.admit_inbound(&content) {
                    return;
                }
                if !self
                    .shared
                    .clipboard
                    .lock()
                    .await
                    .accept_inbound(&content, kind)
                {
                    debug!("Suppressed echoed image event");
                    return;
                }
                let _ = self
                    .event_tx
                    .send(SyncEvent::ClipboardReceived {
                        event_id,
                        content,
                        kind,
                    })
                    .await;
            }

            ServerMessage::ReceiveCommand {
                event_id,
                target_device_id,
                kind,
                payload,
            } => {
                let _ = self
                    .event_tx
                    .send(SyncEvent::CommandReceived {
                        event_id,
                        target_device_id,
                        kind,
                        payload,
                    })
                    .await;
            }

            ServerMessage::DeviceConnected {
                device_id,
                device_name,
            } => {
                let _ = self
                    .event_tx
                    .send(SyncEvent::DeviceConnected {
                        device_id,
                        device_name,
                    })
                    .await;
            }

            ServerMessage::DeviceDisconnected { device_identifier } => {
                let _ = self
                    .event_tx
                    .send(SyncEvent::DeviceDisconnected { device_identifier })
                    .await;
            }

            ServerMessage::Error { message } => {
                warn!(message = %message, "Relay reported an error");
                let _ = self.event_tx.send(SyncEvent::ServerError { message }).await;
            }
        }
    }
}
