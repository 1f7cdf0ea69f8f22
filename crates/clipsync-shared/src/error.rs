use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown device class: {0}")]
    UnknownDeviceClass(u8),

    #[error("Unknown clipboard kind: {0}")]
    UnknownClipboardKind(u8),

    #[error("Unknown command kind: {0}")]
    UnknownCommandKind(u8),
}

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Malformed envelope")]
    MalformedEnvelope,
}
