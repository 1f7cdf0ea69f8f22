use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProtocolError;

/// Account identity owning devices and event history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable record id for one client installation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DeviceId(pub Uuid);

impl DeviceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of one persisted clipboard or command event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Class of the client installation, carried in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeviceClass {
    Other = 0,
    Mobile = 1,
    Desktop = 2,
}

impl DeviceClass {
    pub fn from_u8(b: u8) -> Result<Self, ProtocolError> {
        match b {
            0 => Ok(Self::Other),
            1 => Ok(Self::Mobile),
            2 => Ok(Self::Desktop),
            other => Err(ProtocolError::UnknownDeviceClass(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Whether a device currently holds a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Active,
    Disconnected,
}

/// What a clipboard payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ClipboardKind {
    Text = 0,
    Image = 1,
    Files = 2,
}

impl ClipboardKind {
    pub fn from_u8(b: u8) -> Result<Self, ProtocolError> {
        match b {
            0 => Ok(Self::Text),
            1 => Ok(Self::Image),
            2 => Ok(Self::Files),
            other => Err(ProtocolError::UnknownClipboardKind(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Remote instruction addressed at one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CommandKind {
    EnableTethering = 0,
    DisableTethering = 1,
}

impl CommandKind {
    pub fn from_u8(b: u8) -> Result<Self, ProtocolError> {
        match b {
            0 => Ok(Self::EnableTethering),
            1 => Ok(Self::DisableTethering),
            other => Err(ProtocolError::UnknownCommandKind(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_class_roundtrip() {
        for class in [DeviceClass::Other, DeviceClass::Mobile, DeviceClass::Desktop] {
            assert_eq!(DeviceClass::from_u8(class.as_u8()).unwrap(), class);
        }
    }

    #[test]
    fn test_device_class_rejects_unknown() {
        assert!(DeviceClass::from_u8(3).is_err());
        assert!(DeviceClass::from_u8(255).is_err());
    }

    #[test]
    fn test_clipboard_kind_values_match_wire() {
        assert_eq!(ClipboardKind::Text.as_u8(), 0);
        assert_eq!(ClipboardKind::Image.as_u8(), 1);
        assert_eq!(ClipboardKind::Files.as_u8(), 2);
    }

    #[test]
    fn test_ids_display_as_uuid() {
        let id = UserId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}
