//! Web terminals: one WebSocket bridged to one tty shell per session.

mod decode;
mod registry;
mod session;

pub use decode::{Utf8Decoder, is_echo};
pub use registry::{
    SessionId, SessionNotice, SessionRegistryHandle, SessionRegistryMessage, spawn_registry,
};
pub use session::{SessionEnd, run_session};
