use thiserror::Error;

use clipsync_shared::ProtocolError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Server rejected the handshake: {0}")]
    HandshakeRejected(String),

    #[error("Gave up reconnecting after {attempts} attempts")]
    GaveUp { attempts: u32 },
}
