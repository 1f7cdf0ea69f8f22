//! Optional content encryption around the wire payload.
//!
//! When a pre-shared passphrase and salt are configured, outbound
//! content is replaced by a JSON cipher envelope and inbound content
//! that parses as one is opened. Decryption failure falls back to the
//! raw payload instead of discarding the event. That fallback is
//! deliberately weak: malformed or foreign ciphertext surfaces as
//! garbage text on the clipboard rather than an error, and an attacker
//! who can inject events can always bypass the envelope entirely.

use tracing::warn;

use clipsync_shared::crypto::{self, CipherEnvelope, SymmetricKey};

pub struct ContentCipher {
    key: SymmetricKey,
}

impl ContentCipher {
    /// Build from the out-of-band passphrase and salt.
    pub fn new(passphrase: &str, salt: &str) -> Self {
        Self {
            key: crypto::derive_content_key(passphrase, salt),
        }
    }

    /// Seal content for submission. On encryption failure the plaintext
    /// is sent as-is, logged.
    pub fn protect(&self, content: &str) -> String {
        match crypto::seal(&self.key, content.as_bytes()) {
            Ok(envelope) => match serde_json::to_string(&envelope) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Envelope serialization failed, sending plaintext");
                    content.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "Encryption failed, sending plaintext");
                content.to_string()
            }
        }
    }

    /// Recover content from an inbound payload. Anything that is not a
    /// well-formed envelope, or fails to open, comes back unchanged.
    pub fn recover(&self, payload: &str) -> String {
        let Ok(envelope) = serde_json::from_str::<CipherEnvelope>(payload) else {
            return payload.to_string();
        };

        match crypto::open(&self.key, &envelope) {
            Ok(plaintext) => match String::from_utf8(plaintext) {
                Ok(text) => text,
                Err(_) => {
                    warn!("Decrypted payload is not UTF-8, keeping raw payload");
                    payload.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "Decryption failed, keeping raw payload");
                payload.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protect_recover_roundtrip() {
        let cipher = ContentCipher::new("passphrase", "salt");
        let sealed = cipher.protect("copied text");

        assert_ne!(sealed, "copied text");
        assert_eq!(cipher.recover(&sealed), "copied text");
    }

    #[test]
    fn test_plaintext_passes_through() {
        let cipher = ContentCipher::new("passphrase", "salt");
        assert_eq!(cipher.recover("just text"), "just text");
    }

    #[test]
    fn test_wrong_key_falls_back_to_raw() {
        let sender = ContentCipher::new("theirs", "salt");
        let receiver = ContentCipher::new("ours", "salt");

        let sealed = sender.protect("secret");
        // Cannot open, so the raw envelope text comes through.
        assert_eq!(receiver.recover(&sealed), sealed);
    }

    #[test]
    fn test_envelope_shaped_json_without_valid_fields() {
        let cipher = ContentCipher::new("p", "s");
        let bogus = r#"{"nonce":"x","ciphertext":"y","tag":"z"}"#;
        assert_eq!(cipher.recover(bogus), bogus);
    }
}
