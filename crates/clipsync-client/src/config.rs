use clipsync_shared::constants::{DEFAULT_MAX_PAYLOAD_BYTES, SYNC_PATH};
use clipsync_shared::types::DeviceClass;

use crate::backoff::ReconnectPolicy;

/// Everything the connection driver needs to reach and identify
/// itself to a relay server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base server URL without a path, e.g. `ws://relay.example:8080`.
    pub server_url: String,
    /// Bearer credential from the login endpoint.
    pub access_token: String,
    pub device_name: String,
    pub device_class: DeviceClass,
    /// Stable across restarts so the server keeps one record per
    /// installation.
    pub device_identifier: String,
    /// Network-side payload ceiling.
    pub max_transfer_bytes: usize,
    /// Local-side payload ceiling, may be lower on constrained devices.
    pub max_local_bytes: usize,
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    pub fn new(
        server_url: impl Into<String>,
        access_token: impl Into<String>,
        device_name: impl Into<String>,
        device_class: DeviceClass,
        device_identifier: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            access_token: access_token.into(),
            device_name: device_name.into(),
            device_class,
            device_identifier: device_identifier.into(),
            max_transfer_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_local_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Full handshake URL for one connection attempt.
    pub fn sync_url(&self) -> String {
        format!(
            "{}{}?access_token={}&device_name={}&device_class={}&device_identifier={}",
            self.server_url.trim_end_matches('/'),
            SYNC_PATH,
            urlencode(&self.access_token),
            urlencode(&self.device_name),
            self.device_class.as_u8(),
            urlencode(&self.device_identifier),
        )
    }
}

/// Minimal percent-encoding for query values.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
