//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::time::Duration;

use clipsync_shared::constants::{
    DEFAULT_HTTP_PORT, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_RETENTION_SECS, DEFAULT_TOKEN_TTL_SECS,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP/WebSocket (axum) server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Maximum accepted clipboard/command payload in bytes.
    /// Env: `MAX_PAYLOAD_BYTES`
    /// Default: 10 MiB
    pub max_payload_bytes: usize,

    /// How long clipboard/command events are retained.
    /// Env: `RETENTION_SECS`
    /// Default: 24 h
    pub retention: Duration,

    /// Bearer token lifetime.
    /// Env: `TOKEN_TTL_SECS`
    /// Default: 7 days
    pub token_ttl: Duration,

    /// Outbound queue depth per connection before a member is
    /// considered lagging.
    /// Env: `CONNECTION_QUEUE_DEPTH`
    /// Default: 64
    pub connection_queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            connection_queue_depth: 64,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(val) = std::env::var("MAX_PAYLOAD_BYTES") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_payload_bytes = n;
            }
        }

        if let Ok(val) = std::env::var("RETENTION_SECS") {
            if let Ok(n) = val.parse::<u64>() {
                config.retention = Duration::from_secs(n);
            }
        }

        if let Ok(val) = std::env::var("TOKEN_TTL_SECS") {
            if let Ok(n) = val.parse::<u64>() {
                config.token_ttl = Duration::from_secs(n);
            }
        }

        if let Ok(val) = std::env::var("CONNECTION_QUEUE_DEPTH") {
            if let Ok(n) = val.parse::<usize>() {
                if n > 0 {
                    config.connection_queue_depth = n;
                }
            }
        }

        config
    }
}
