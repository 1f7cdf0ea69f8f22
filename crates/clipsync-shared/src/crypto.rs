//! Optional end-to-end payload encryption.
//!
//! Content is sealed with XChaCha20-Poly1305 under a key derived from a
//! pre-shared passphrase and salt (BLAKE3 KDF with domain separation).
//! The wire form is a JSON envelope `{nonce, ciphertext, tag}` with
//! base64 fields, so a receiver can tell an envelope from plaintext.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::constants::{KDF_CONTEXT_CONTENT_KEY, NONCE_SIZE, SYMMETRIC_KEY_SIZE, TAG_SIZE};
use crate::error::CryptoError;

pub type SymmetricKey = [u8; SYMMETRIC_KEY_SIZE];

/// Authenticated-encryption envelope carried in place of the payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CipherEnvelope {
    pub nonce: String,
    pub ciphertext: String,
    pub tag: String,
}

/// Derive the content key from the pre-shared passphrase and salt.
pub fn derive_content_key(passphrase: &str, salt: &str) -> SymmetricKey {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_CONTENT_KEY);
    hasher.update(passphrase.as_bytes());
    hasher.update(salt.as_bytes());
    let hash = hasher.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&hash.as_bytes()[..32]);
    key
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Seal plaintext into an envelope.
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<CipherEnvelope, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let mut sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    // Split the trailing Poly1305 tag into its own field
    let tag = sealed.split_off(sealed.len() - TAG_SIZE);

    Ok(CipherEnvelope {
        nonce: BASE64.encode(nonce_bytes),
        ciphertext: BASE64.encode(sealed),
        tag: BASE64.encode(tag),
    })
}

/// Open an envelope back into plaintext.
pub fn open(key: &SymmetricKey, envelope: &CipherEnvelope) -> Result<Vec<u8>, CryptoError> {
    let nonce_bytes = BASE64
        .decode(&envelope.nonce)
        .map_err(|_| CryptoError::MalformedEnvelope)?;
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(CryptoError::MalformedEnvelope);
    }
    let mut sealed = BASE64
        .decode(&envelope.ciphertext)
        .map_err(|_| CryptoError::MalformedEnvelope)?;
    let tag = BASE64
        .decode(&envelope.tag)
        .map_err(|_| CryptoError::MalformedEnvelope)?;
    if tag.len() != TAG_SIZE {
        return Err(CryptoError::MalformedEnvelope);
    }
    sealed.extend_from_slice(&tag);

    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(&nonce_bytes);

    cipher
        .decrypt(nonce, sealed.as_ref())
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = derive_content_key("correct horse", "salt-1");
        let plaintext = b"copied to clipboard";

        let envelope = seal(&key, plaintext).unwrap();
        let opened = open(&key, &envelope).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let key1 = derive_content_key("passphrase", "salt");
        let key2 = derive_content_key("other", "salt");

        let envelope = seal(&key1, b"secret").unwrap();
        assert!(open(&key2, &envelope).is_err());
    }

    #[test]
    fn test_different_salt_different_key() {
        assert_ne!(
            derive_content_key("p", "salt-a"),
            derive_content_key("p", "salt-b")
        );
    }

    #[test]
    fn test_key_derivation_deterministic() {
        assert_eq!(
            derive_content_key("p", "s"),
            derive_content_key("p", "s")
        );
    }

    #[test]
    fn test_tampered_tag_fails() {
        let key = derive_content_key("p", "s");
        let mut envelope = seal(&key, b"payload").unwrap();
        envelope.tag = BASE64.encode([0u8; TAG_SIZE]);
        assert!(open(&key, &envelope).is_err());
    }

    #[test]
    fn test_malformed_envelope_fields() {
        let key = derive_content_key("p", "s");
        let envelope = CipherEnvelope {
            nonce: "!!not-base64!!".to_string(),
            ciphertext: String::new(),
            tag: String::new(),
        };
        assert!(matches!(
            open(&key, &envelope),
            Err(CryptoError::MalformedEnvelope)
        ));
    }

    #[test]
    fn test_envelope_serializes_with_named_fields() {
        let key = derive_content_key("p", "s");
        let envelope = seal(&key, b"x").unwrap();
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("nonce"));
        assert!(json.contains("ciphertext"));
        assert!(json.contains("tag"));
    }
}
