//! Client resilience layer for the clipboard relay.
//!
//! Everything between the embedding application and the wire lives
//! here: the reconnect state machine, payload size gating, self-echo
//! suppression, optional payload encryption, and the clipboard poll
//! loop. The platform clipboard itself is behind the
//! [`ClipboardAccess`] trait; the embedding app supplies it.

pub mod backoff;
pub mod cipher;
pub mod config;
pub mod connection;
pub mod gate;
pub mod suppress;
pub mod watcher;

mod error;

pub use backoff::{ReconnectPolicy, ReconnectSchedule};
pub use cipher::ContentCipher;
pub use config::ClientConfig;
pub use connection::{Connection, SyncEvent};
pub use error::ClientError;
pub use gate::PayloadGate;
pub use suppress::LocalClipboard;
pub use watcher::{ClipboardAccess, ClipboardWatcher};
