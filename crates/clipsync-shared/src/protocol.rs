//! JSON wire protocol between a client and the relay.
//!
//! Every message carries an explicit `type` tag so that clipboard and
//! command payloads never have to be told apart by shape.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::{ClipboardKind, CommandKind, DeviceId, EventId};

/// Messages a client sends to the relay after registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Publish a clipboard value to the user's other devices.
    SubmitClipboard {
        content: String,
        kind: ClipboardKind,
    },

    /// Send a remote instruction to one of the user's devices.
    SubmitCommand {
        target_device_id: DeviceId,
        kind: CommandKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<String>,
    },
}

/// Messages the relay pushes to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A device of this user completed registration.
    DeviceConnected {
        device_id: DeviceId,
        device_name: String,
    },

    /// A device of this user dropped its connection.
    DeviceDisconnected { device_identifier: String },

    /// Clipboard value published by another device.
    ReceiveClipboard {
        event_id: EventId,
        content: String,
        kind: ClipboardKind,
    },

    /// Remote instruction; only the targeted device acts on it.
    ReceiveCommand {
        event_id: EventId,
        target_device_id: DeviceId,
        kind: CommandKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<String>,
    },

    /// A submission was rejected; the connection stays usable.
    Error { message: String },
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ServerMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClipboardKind;

    #[test]
    fn test_submit_clipboard_tagged() {
        let msg = ClientMessage::SubmitClipboard {
            content: "hello".to_string(),
            kind: ClipboardKind::Text,
        };
        let json = msg.encode().unwrap();
        assert!(json.contains("\"type\":\"submit_clipboard\""));
        assert_eq!(ClientMessage::decode(&json).unwrap(), msg);
    }

    #[test]
    fn test_command_payload_omitted_when_absent() {
        let msg = ClientMessage::SubmitCommand {
            target_device_id: DeviceId::new(),
            kind: CommandKind::EnableTethering,
            payload: None,
        };
        let json = msg.encode().unwrap();
        assert!(!json.contains("payload"));
    }

    #[test]
    fn test_server_message_roundtrip() {
        let msg = ServerMessage::ReceiveClipboard {
            event_id: EventId::new(),
            content: "copied".to_string(),
            kind: ClipboardKind::Text,
        };
        let decoded = ServerMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(ClientMessage::decode(r#"{"type":"bogus"}"#).is_err());
    }
}
