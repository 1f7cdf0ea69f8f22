//! # clipsync-store
//!
//! Persistence layer for the relay: a keyed record store abstraction
//! (hash-like records, per-user time-ranked indexes, TTLs, atomic
//! multi-key writes) plus the typed repositories built on top of it:
//! the session directory of devices, the bounded event log, and user
//! accounts.

pub mod devices;
pub mod events;
pub mod models;
pub mod store;
pub mod users;

mod error;

pub use devices::SessionDirectory;
pub use error::{Result, StoreError};
pub use events::EventLog;
pub use models::*;
pub use store::{MemoryStore, RecordStore, WriteOp};
pub use users::UserStore;
