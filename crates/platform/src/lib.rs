//! Capability surface of the remote chat platform.
//!
//! The migration engine never talks HTTP itself. It drives a [`Platform`]
//! for channel reads and writes, and a [`ProxySender`] for the
//! create/send/delete lifecycle of the send-identity proxy. Bindings such as
//! `forumlift-discord` implement both; the `memory` feature provides an
//! in-memory fake for tests.

pub mod error;
pub mod platform;

#[cfg(feature = "memory")]
pub mod memory;

pub use error::PlatformError;
pub use platform::{NewPost, Platform, ProxyHandle, ProxySender};

#[cfg(feature = "memory")]
pub use memory::{CallLog, MemoryPlatform, SendOutcome, SentMessage};
