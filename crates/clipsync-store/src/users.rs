//! User accounts. Thin: the relay only needs them to hand out bearer
//! credentials.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::debug;

use clipsync_shared::types::UserId;

use crate::error::{Result, StoreError};
use crate::models::{user_key, username_key, User};
use crate::store::{RecordStore, WriteOp};

pub struct UserStore {
    store: Arc<dyn RecordStore>,
    // Serializes create() so two registrations cannot both claim a
    // username between the existence check and the write.
    create_lock: Mutex<()>,
}

impl UserStore {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            create_lock: Mutex::new(()),
        }
    }

    /// Create an account. Fails if the username is taken.
    pub fn create(&self, username: &str, password_hash: &str, salt: &str) -> Result<User> {
        let _guard = self.create_lock.lock().unwrap_or_else(|e| e.into_inner());

        if self.store.get(&username_key(username))?.is_some() {
            return Err(StoreError::AlreadyExists(username.to_string()));
        }

        let user = User {
            id: UserId::new(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            salt: salt.to_string(),
            created_at: Utc::now(),
        };

        self.store.apply(vec![
            WriteOp::PutRecord {
                key: user_key(user.id),
                value: serde_json::to_vec(&user)?,
                ttl: None,
            },
            WriteOp::PutRecord {
                key: username_key(username),
                value: user.id.to_string().into_bytes(),
                ttl: None,
            },
        ])?;

        debug!(user = %user.id, username = %username, "Created user");
        Ok(user)
    }

    pub fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let Some(raw_id) = self.store.get(&username_key(username))? else {
            return Ok(None);
        };
        let Ok(id) = String::from_utf8(raw_id)
            .map_err(|_| ())
            .and_then(|s| s.parse::<uuid::Uuid>().map_err(|_| ()))
        else {
            return Ok(None);
        };
        self.get_by_id(UserId(id))
    }

    pub fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        match self.store.get(&user_key(id))? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }
}
