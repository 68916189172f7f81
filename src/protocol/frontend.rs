//! Client-to-server messages.
use bytes::{BufMut, BytesMut};

use crate::{
    codec,
    ext::{BufMutExt, UsizeExt, WireLenExt},
    value::Value,
};

/// Write a frontend message to `buf`, framed.
pub fn write<F: FrontendProtocol>(msg: F, buf: &mut BytesMut) {
    let size_hint = msg.size_hint();
    buf.reserve(super::FRAME_PREFIX + size_hint as usize);

    let offset = buf.len();
    buf.put_u8(F::OPCODE);
    buf.put_u32(size_hint);

    msg.encode(&mut *buf);

    assert_eq!(
        buf.len() - offset,
        super::FRAME_PREFIX + size_hint as usize,
        "frontend message body size not equal to size hint",
    );
}

/// A type which can be encoded into a frontend message.
pub trait FrontendProtocol {
    /// Message opcode.
    const OPCODE: u8;

    /// Size of the body, excluding the frame prefix.
    fn size_hint(&self) -> u32;

    /// Write the body of the message.
    ///
    /// The length of the body written must be equal to the length
    /// returned by [`size_hint`][FrontendProtocol::size_hint].
    fn encode(self, buf: impl BufMut);
}

/// Version negotiation, the very first message on a connection.
#[derive(Debug)]
pub struct Hello<'a> {
    /// Highest protocol version the client can speak.
    pub version: u32,
    /// Driver name and version, for server-side diagnostics.
    pub client_name: &'a str,
}

impl FrontendProtocol for Hello<'_> {
    const OPCODE: u8 = 0x01;

    fn size_hint(&self) -> u32 {
        4 + self.client_name.wire_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u32(self.version);
        buf.put_str(self.client_name);
    }
}

/// Credential exchange.
#[derive(Debug)]
pub struct Authenticate<'a> {
    pub user: &'a str,
    /// Keyed digest over the server's salt and nonce.
    pub digest: &'a [u8],
    /// Requested session cipher, `0` for none.
    pub cipher: u8,
}

impl FrontendProtocol for Authenticate<'_> {
    const OPCODE: u8 = 0x02;

    fn size_hint(&self) -> u32 {
        self.user.wire_len() + self.digest.wire_len() + 1
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_str(self.user);
        buf.put_blob(self.digest);
        buf.put_u8(self.cipher);
    }
}

/// Session configuration, individually acknowledged by [`PropertyAck`][1].
///
/// [1]: crate::protocol::backend::PropertyAck
#[derive(Debug)]
pub struct SetProperty<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

impl FrontendProtocol for SetProperty<'_> {
    const OPCODE: u8 = 0x03;

    fn size_hint(&self) -> u32 {
        self.name.wire_len() + self.value.wire_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_str(self.name);
        buf.put_str(self.value);
    }
}

/// Compile a statement server-side, answered by [`PrepareAck`][1].
///
/// [1]: crate::protocol::backend::PrepareAck
#[derive(Debug)]
pub struct Prepare<'a> {
    pub sql: &'a str,
}

impl FrontendProtocol for Prepare<'_> {
    const OPCODE: u8 = 0x04;

    fn size_hint(&self) -> u32 {
        self.sql.wire_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_str(self.sql);
    }
}

/// Execute a prepared statement with tagged parameter values.
#[derive(Debug)]
pub struct Execute<'a> {
    pub stmt: u32,
    pub params: &'a [Value],
}

impl FrontendProtocol for Execute<'_> {
    const OPCODE: u8 = 0x05;

    fn size_hint(&self) -> u32 {
        4 + 2 + self.params.iter().map(codec::encoded_len).sum::<u32>()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u32(self.stmt);
        buf.put_u16(self.params.len().to_u16());
        for param in self.params {
            codec::encode_param(param, &mut buf);
        }
    }
}

/// Pull the next batch of rows from an open cursor.
#[derive(Debug)]
pub struct Fetch {
    pub cursor: u32,
    /// Upper bound on rows in the answering batch, bounding client memory.
    pub max_rows: u32,
}

impl FrontendProtocol for Fetch {
    const OPCODE: u8 = 0x06;

    fn size_hint(&self) -> u32 {
        4 + 4
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u32(self.cursor);
        buf.put_u32(self.max_rows);
    }
}

/// Release a server-side cursor.
#[derive(Debug)]
pub struct CloseCursor {
    pub cursor: u32,
}

impl FrontendProtocol for CloseCursor {
    const OPCODE: u8 = 0x07;

    fn size_hint(&self) -> u32 {
        4
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u32(self.cursor);
    }
}

/// Release a server-side statement.
#[derive(Debug)]
pub struct CloseStatement {
    pub stmt: u32,
}

impl FrontendProtocol for CloseStatement {
    const OPCODE: u8 = 0x08;

    fn size_hint(&self) -> u32 {
        4
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_u32(self.stmt);
    }
}

macro_rules! unit_msg {
    ($(
        $(#[$doc:meta])* struct $name:ident, $op:literal;
    )*) => {$(
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name;

        impl FrontendProtocol for $name {
            const OPCODE: u8 = $op;

            fn size_hint(&self) -> u32 {
                0
            }

            fn encode(self, _: impl BufMut) { }
        }
    )*};
}

unit_msg! {
    /// Open an explicit transaction boundary.
    struct Begin, 0x09;

    /// Commit the active boundary.
    struct Commit, 0x0A;

    /// Roll the active boundary back.
    struct Rollback, 0x0B;

    /// Orderly connection shutdown.
    struct Goodbye, 0x0C;
}
