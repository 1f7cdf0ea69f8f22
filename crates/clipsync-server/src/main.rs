//! # clipsync-server
//!
//! Relay server for clipboard synchronization.
//!
//! This binary provides:
//! - **WebSocket relay** (`/sync`) that fans clipboard and command
//!   events out to every connection a user has attached
//! - **Session directory** tracking each device's stable identity
//!   across reconnects
//! - **TTL-bounded event log** so a device that was offline can catch
//!   up on recent history
//! - **REST API** (axum) for health checks, registration, and login

mod api;
mod auth;
mod config;
mod error;
mod groups;
mod hub;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use clipsync_store::{EventLog, MemoryStore, RecordStore, SessionDirectory, UserStore};

use crate::api::AppState;
use crate::auth::TokenIssuer;
use crate::config::ServerConfig;
use crate::groups::GroupRouter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,clipsync_server=debug")),
        )
        .init();

    info!("Starting clipsync relay server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let config = Arc::new(config);

    let app_state = AppState {
        sessions: Arc::new(SessionDirectory::new(store.clone())),
        events: Arc::new(EventLog::new(store.clone(), config.retention)),
        users: Arc::new(UserStore::new(store.clone())),
        tokens: Arc::new(TokenIssuer::new(store, config.token_ttl)),
        groups: Arc::new(GroupRouter::new()),
        config: config.clone(),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP/WebSocket server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
