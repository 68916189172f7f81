//! Wire protocol messages.
//!
//! Every message is framed as `opcode: u8`, `length: u32` of the body in
//! big-endian, then the body. Opcodes below `0x40` identify client
//! ([`frontend`]) messages, the rest identify server ([`backend`]) messages.
use std::{borrow::Cow, fmt, str::Utf8Error};

pub mod frontend;
pub mod backend;

pub use frontend::FrontendProtocol;
pub use backend::{BackendMessage, BackendProtocol};

/// Negotiated protocol version requested by this client.
pub const PROTOCOL_VERSION: u32 = 12;

/// Oldest protocol version this client can still talk to.
pub const MIN_PROTOCOL_VERSION: u32 = 10;

/// Frame prefix: opcode plus body length.
pub(crate) const FRAME_PREFIX: usize = 1 + 4;

/// An error when a message cannot be read or written as specified.
///
/// A `ProtocolError` means one side no longer agrees on the message
/// boundaries, the connection is not usable afterwards.
pub struct ProtocolError {
    reason: Cow<'static, str>,
}

impl ProtocolError {
    pub(crate) fn new(reason: impl Into<Cow<'static, str>>) -> Self {
        Self { reason: reason.into() }
    }

    /// Opcode is not any known backend message.
    pub(crate) fn unknown(opcode: u8) -> Self {
        Self::new(format!("unknown opcode {opcode:#04x}"))
    }

    /// Backend message differs from what the exchange expects.
    pub(crate) fn unexpected(name: &'static str, expected: u8, got: u8) -> Self {
        Self::new(format!(
            "expected {name} ({expected:#04x}), got opcode {got:#04x}",
        ))
    }

    /// Message body ended before the announced content.
    pub(crate) fn malformed(what: &'static str) -> Self {
        Self::new(format!("malformed message body: truncated {what}"))
    }

    pub(crate) fn non_utf8(_: Utf8Error) -> Self {
        Self::new("non utf-8 string in message body")
    }

    /// Server negotiated a version this client cannot speak.
    pub(crate) fn version(version: u32) -> Self {
        Self::new(format!("unsupported protocol version {version}"))
    }
}

impl std::error::Error for ProtocolError { }

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol violation: {}", self.reason)
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
