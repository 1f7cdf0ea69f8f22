/// WebSocket relay endpoint path.
pub const SYNC_PATH: &str = "/sync";

/// Application name.
pub const APP_NAME: &str = "clipsync";

/// XChaCha20-Poly1305 nonce size in bytes.
pub const NONCE_SIZE: usize = 24;

/// Poly1305 authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Symmetric key size in bytes.
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Maximum payload size accepted on the wire (10 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 10_485_760;

/// How long clipboard/command events are retained, in seconds (24 h).
pub const DEFAULT_RETENTION_SECS: u64 = 24 * 60 * 60;

/// Bearer token lifetime in seconds (7 days).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// First reconnect delay in seconds.
pub const RECONNECT_INITIAL_SECS: u64 = 1;

/// Reconnect delay cap in seconds.
pub const RECONNECT_CAP_SECS: u64 = 10;

/// Reconnect attempts before giving up.
pub const RECONNECT_MAX_ATTEMPTS: u32 = 10;

/// Default HTTP port for the relay server.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Key derivation context (BLAKE3).
pub const KDF_CONTEXT_CONTENT_KEY: &str = "clipsync-content-key-v1";
