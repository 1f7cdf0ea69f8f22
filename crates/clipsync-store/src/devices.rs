//! Session directory: durable device records keyed by
//! `(user, device identifier)`.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, warn};

use clipsync_shared::types::{ConnectionState, DeviceClass, DeviceId, UserId};

use crate::error::Result;
use crate::models::{device_identity_key, device_key, user_devices_key, Device};
use crate::store::{RecordStore, WriteOp};

/// Tracks which installations exist for each user and whether they are
/// currently connected.
pub struct SessionDirectory {
    store: Arc<dyn RecordStore>,
    // Serializes the read-modify-write in `upsert` so that two
    // concurrent handshakes with the same identifier converge on one
    // record. Never held across anything but store calls.
    upsert_lock: Mutex<()>,
}

impl SessionDirectory {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            upsert_lock: Mutex::new(()),
        }
    }

    /// Create or refresh the device record for this identity and mark
    /// it active. Repeated calls with the same `(user, identifier)`
    /// always converge to a single record.
    pub fn upsert(
        &self,
        user: UserId,
        identifier: &str,
        name: &str,
        class: DeviceClass,
    ) -> Result<Device> {
        let _guard = self.upsert_lock.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(mut device) = self.get_by_identity(user, identifier)? {
            device.name = name.to_string();
            device.class = class;
            device.state = ConnectionState::Active;
            self.store.apply(vec![WriteOp::PutRecord {
                key: device_key(device.id),
                value: serde_json::to_vec(&device)?,
                ttl: None,
            }])?;
            debug!(user = %user, device = %device.id, "Refreshed device record");
            return Ok(device);
        }

        let device = Device {
            id: DeviceId::new(),
            user_id: user,
            name: name.to_string(),
            class,
            device_identifier: identifier.to_string(),
            state: ConnectionState::Active,
            created_at: Utc::now(),
        };

        // Record, identity index and per-user listing go in together so
        // a created device is always findable by identity.
        self.store.apply(vec![
            WriteOp::PutRecord {
                key: device_key(device.id),
                value: serde_json::to_vec(&device)?,
                ttl: None,
            },
            WriteOp::PutRecord {
                key: device_identity_key(user, identifier),
                value: device.id.to_string().into_bytes(),
                ttl: None,
            },
            WriteOp::IndexInsert {
                index: user_devices_key(user),
                score: device.created_at.timestamp_millis(),
                member: device.id.to_string(),
                ttl: None,
            },
        ])?;

        debug!(user = %user, device = %device.id, name = %name, "Created device record");
        Ok(device)
    }

    /// Flip the device to `Disconnected`. A missing record is logged
    /// and ignored: the device may have never completed a handshake.
    pub fn mark_disconnected(&self, user: UserId, identifier: &str) -> Result<()> {
        let Some(mut device) = self.get_by_identity(user, identifier)? else {
            warn!(user = %user, identifier = %identifier, "Disconnect for unknown device");
            return Ok(());
        };

        device.state = ConnectionState::Disconnected;
        self.store.apply(vec![WriteOp::PutRecord {
            key: device_key(device.id),
            value: serde_json::to_vec(&device)?,
            ttl: None,
        }])?;
        debug!(user = %user, device = %device.id, "Marked device disconnected");
        Ok(())
    }

    pub fn get_by_identity(&self, user: UserId, identifier: &str) -> Result<Option<Device>> {
        let Some(raw_id) = self.store.get(&device_identity_key(user, identifier))? else {
            return Ok(None);
        };
        let Ok(id) = String::from_utf8(raw_id)
            .map_err(|_| ())
            .and_then(|s| s.parse::<uuid::Uuid>().map_err(|_| ()))
        else {
            warn!(user = %user, identifier = %identifier, "Corrupt device identity index");
            return Ok(None);
        };
        self.get_by_id(DeviceId(id))
    }

    pub fn get_by_id(&self, id: DeviceId) -> Result<Option<Device>> {
        match self.store.get(&device_key(id))? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    /// All device records of a user, newest first.
    pub fn list_by_user(&self, user: UserId) -> Result<Vec<Device>> {
        let members = self.store.index_rev_range(&user_devices_key(user), usize::MAX)?;
        let mut devices = Vec::with_capacity(members.len());
        for member in members {
            let Ok(id) = member.parse::<uuid::Uuid>() else {
                continue;
            };
            if let Some(device) = self.get_by_id(DeviceId(id))? {
                devices.push(device);
            }
        }
        Ok(devices)
    }
}
