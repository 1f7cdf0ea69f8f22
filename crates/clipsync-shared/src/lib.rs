//! # clipsync-shared
//!
//! Types shared between the relay server and the client library:
//! domain identifiers and enums, the JSON wire protocol, the optional
//! payload encryption envelope, and common constants.

pub mod constants;
pub mod crypto;
pub mod protocol;
pub mod types;

mod error;

pub use error::{CryptoError, ProtocolError};
