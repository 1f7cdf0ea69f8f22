//! Persisted domain records and their key layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clipsync_shared::types::{
    ClipboardKind, CommandKind, ConnectionState, DeviceClass, DeviceId, EventId, UserId,
};

/// An account. Immutable after creation apart from credential rotation,
/// which is handled elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Argon2id hash of the password, hex-encoded.
    pub password_hash: String,
    /// Per-user random salt, hex-encoded.
    pub salt: String,
    pub created_at: DateTime<Utc>,
}

/// One client installation of a user.
///
/// Keyed by `(user_id, device_identifier)`; reconnecting with the same
/// identifier updates this record instead of creating a second one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Device {
    pub id: DeviceId,
    pub user_id: UserId,
    pub name: String,
    pub class: DeviceClass,
    /// Stable per-install identifier, persisted on the client.
    pub device_identifier: String,
    pub state: ConnectionState,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of one clipboard submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipboardEvent {
    pub id: EventId,
    pub user_id: UserId,
    pub content: String,
    pub kind: ClipboardKind,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of one remote instruction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandEvent {
    pub id: EventId,
    pub user_id: UserId,
    pub target_device_id: DeviceId,
    pub kind: CommandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tagged union stored in the event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Clipboard(ClipboardEvent),
    Command(CommandEvent),
}

impl Event {
    pub fn id(&self) -> EventId {
        match self {
            Event::Clipboard(e) => e.id,
            Event::Command(e) => e.id,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            Event::Clipboard(e) => e.user_id,
            Event::Command(e) => e.user_id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Event::Clipboard(e) => e.created_at,
            Event::Command(e) => e.created_at,
        }
    }
}

// Key layout, shared by every repository:
//   user:{id}                          user record
//   user:index:name:{username}         username -> user id
//   device:{id}                        device record
//   device:index:{user}:{identifier}   identity -> device id
//   device:index:user:{user}           sorted index of a user's devices
//   event:{id}                         clipboard/command body (TTL)
//   event:index:user:{user}            sorted index of a user's events (TTL)

pub fn user_key(id: UserId) -> String {
    format!("user:{id}")
}

pub fn username_key(username: &str) -> String {
    format!("user:index:name:{username}")
}

pub fn device_key(id: DeviceId) -> String {
    format!("device:{id}")
}

pub fn device_identity_key(user: UserId, identifier: &str) -> String {
    format!("device:index:{user}:{identifier}")
}

pub fn user_devices_key(user: UserId) -> String {
    format!("device:index:user:{user}")
}

pub fn event_key(id: EventId) -> String {
    format!("event:{id}")
}

pub fn user_events_key(user: UserId) -> String {
    format!("event:index:user:{user}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_union_tagged() {
        let event = Event::Clipboard(ClipboardEvent {
            id: EventId::new(),
            user_id: UserId::new(),
            content: "hi".to_string(),
            kind: ClipboardKind::Text,
            created_at: Utc::now(),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"clipboard\""));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_keys_disjoint_per_user() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(user_events_key(a), user_events_key(b));
        assert_ne!(device_identity_key(a, "x"), device_identity_key(b, "x"));
        assert_ne!(device_identity_key(a, "x"), device_identity_key(a, "y"));
    }
}
