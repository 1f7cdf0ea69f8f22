//! Password hashing and bearer token issuance.
//!
//! Passwords are hashed with Argon2id under a per-user random salt.
//! Tokens are opaque random values stored with a TTL through the record
//! store; the WebSocket handshake resolves them back to a user id.

use std::sync::Arc;
use std::time::Duration;

use argon2::Argon2;
use rand::RngCore;
use tracing::debug;

use clipsync_shared::types::UserId;
use clipsync_store::{RecordStore, WriteOp};

use crate::error::ServerError;

/// Generate a per-user random salt.
pub fn generate_salt() -> [u8; 32] {
    let mut salt = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Hash a password with Argon2id under the given salt.
pub fn hash_password(password: &str, salt: &[u8]) -> Result<[u8; 32], ServerError> {
    let mut hash = [0u8; 32];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| ServerError::Internal(format!("Password hashing failed: {e}")))?;
    Ok(hash)
}

/// Verify a password against a stored hash and salt.
pub fn verify_password(
    password: &str,
    stored_hash: &[u8],
    salt: &[u8],
) -> Result<bool, ServerError> {
    let computed = hash_password(password, salt)?;
    Ok(computed.as_slice() == stored_hash)
}

fn token_key(token: &str) -> String {
    format!("token:{token}")
}

/// Issues and resolves bearer tokens.
pub struct TokenIssuer {
    store: Arc<dyn RecordStore>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn RecordStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Mint a fresh token for the user.
    pub fn issue(&self, user: UserId) -> Result<String, ServerError> {
        let mut raw = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut raw);
        let token = hex::encode(raw);

        self.store.apply(vec![WriteOp::PutRecord {
            key: token_key(&token),
            value: user.to_string().into_bytes(),
            ttl: Some(self.ttl),
        }])?;

        debug!(user = %user, "Issued bearer token");
        Ok(token)
    }

    /// Resolve a presented token; `None` means unknown or expired.
    pub fn authenticate(&self, token: &str) -> Result<Option<UserId>, ServerError> {
        let Some(raw) = self.store.get(&token_key(token))? else {
            return Ok(None);
        };
        let id = String::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse::<uuid::Uuid>().ok());
        Ok(id.map(UserId))
    }

    /// Invalidate a token (logout).
    pub fn revoke(&self, token: &str) -> Result<(), ServerError> {
        self.store.apply(vec![WriteOp::DeleteRecord {
            key: token_key(token),
        }])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsync_store::MemoryStore;

    #[test]
    fn test_hash_verify() {
        let salt = generate_salt();
        let hash = hash_password("hunter2", &salt).unwrap();

        assert!(verify_password("hunter2", &hash, &salt).unwrap());
        assert!(!verify_password("wrong", &hash, &salt).unwrap());
    }

    #[test]
    fn test_token_roundtrip() {
        let store = Arc::new(MemoryStore::new());
        let issuer = TokenIssuer::new(store, Duration::from_secs(60));
        let user = UserId::new();

        let token = issuer.issue(user).unwrap();
        assert_eq!(issuer.authenticate(&token).unwrap(), Some(user));
        assert_eq!(issuer.authenticate("bogus").unwrap(), None);
    }

    #[test]
    fn test_token_expiry() {
        let store = Arc::new(MemoryStore::new());
        let issuer = TokenIssuer::new(store.clone(), Duration::from_secs(60));
        let token = issuer.issue(UserId::new()).unwrap();

        store.advance(Duration::from_secs(61));
        assert_eq!(issuer.authenticate(&token).unwrap(), None);
    }

    #[test]
    fn test_token_revoke() {
        let store = Arc::new(MemoryStore::new());
        let issuer = TokenIssuer::new(store, Duration::from_secs(60));
        let token = issuer.issue(UserId::new()).unwrap();

        issuer.revoke(&token).unwrap();
        assert_eq!(issuer.authenticate(&token).unwrap(), None);
    }
}
