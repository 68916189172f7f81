//! Server-to-client messages.
use bytes::{Buf, Bytes};

use super::ProtocolError;
use crate::{
    common::ByteStr,
    error::DbError,
    ext::BufExt,
    result::GeneratedKey,
    sqltype::ColumnDesc,
};

/// A type that can be decoded from a backend message.
pub trait BackendProtocol: Sized {
    fn decode(opcode: u8, body: Bytes) -> Result<Self, ProtocolError>;
}

/// Any backend message.
#[derive(Debug)]
pub enum BackendMessage {
    HelloAck(HelloAck),
    AuthOk(AuthOk),
    PropertyAck(PropertyAck),
    PrepareAck(PrepareAck),
    ExecuteAck(ExecuteAck),
    RowBatch(RowBatch),
    CloseAck(CloseAck),
    TxAck(TxAck),
    Status(Status),
    GoodbyeAck(GoodbyeAck),
}

macro_rules! match_backend {
    ($($name:ident,)*) => {
        impl BackendMessage {
            pub fn opcode(&self) -> u8 {
                match self {
                    $(Self::$name(_) => $name::OPCODE,)*
                }
            }
        }
        impl BackendProtocol for BackendMessage {
            fn decode(opcode: u8, body: Bytes) -> Result<Self, ProtocolError> {
                let message = match opcode {
                    $($name::OPCODE => Self::$name(<$name as BackendProtocol>::decode(opcode, body)?),)*
                    _ => return Err(ProtocolError::unknown(opcode)),
                };
                Ok(message)
            }
        }
    };
}

match_backend! {
    HelloAck,
    AuthOk,
    PropertyAck,
    PrepareAck,
    ExecuteAck,
    RowBatch,
    CloseAck,
    TxAck,
    Status,
    GoodbyeAck,
}

macro_rules! assert_opcode {
    ($self:ident, $op:ident) => {
        if $self::OPCODE != $op {
            return Err(ProtocolError::unexpected(stringify!($self), $self::OPCODE, $op));
        }
    };
}

/// Version negotiation answer carrying the authentication challenge.
#[derive(Debug)]
pub struct HelloAck {
    /// Highest version the server will speak, at most the requested one.
    pub version: u32,
    /// Per-account salt for the credential digest.
    pub salt: Bytes,
    /// Per-connection nonce for the credential digest.
    pub nonce: Bytes,
}

impl HelloAck {
    pub const OPCODE: u8 = 0x41;
}

impl BackendProtocol for HelloAck {
    fn decode(opcode: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_opcode!(HelloAck, opcode);
        if body.remaining() < 4 {
            return Err(ProtocolError::malformed("HelloAck"));
        }
        Ok(Self {
            version: body.get_u32(),
            salt: body.try_get_blob()?,
            nonce: body.try_get_blob()?,
        })
    }
}

/// Successful credential exchange.
#[derive(Debug)]
pub struct AuthOk {
    /// Key for the session cipher, empty when traffic stays clear.
    pub session_key: Bytes,
}

impl AuthOk {
    pub const OPCODE: u8 = 0x42;
}

impl BackendProtocol for AuthOk {
    fn decode(opcode: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_opcode!(AuthOk, opcode);
        Ok(Self { session_key: body.try_get_blob()? })
    }
}

/// Acknowledges one session property, echoing the effective value.
#[derive(Debug)]
pub struct PropertyAck {
    pub name: ByteStr,
    pub value: ByteStr,
}

impl PropertyAck {
    pub const OPCODE: u8 = 0x43;
}

impl BackendProtocol for PropertyAck {
    fn decode(opcode: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_opcode!(PropertyAck, opcode);
        Ok(Self {
            name: body.try_get_str()?,
            value: body.try_get_str()?,
        })
    }
}

/// A statement compiled server-side.
#[derive(Debug)]
pub struct PrepareAck {
    /// Server-assigned statement handle.
    pub stmt: u32,
    /// Number of parameter placeholders the statement expects.
    pub param_count: u16,
}

impl PrepareAck {
    pub const OPCODE: u8 = 0x44;
}

impl BackendProtocol for PrepareAck {
    fn decode(opcode: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_opcode!(PrepareAck, opcode);
        if body.remaining() < 6 {
            return Err(ProtocolError::malformed("PrepareAck"));
        }
        Ok(Self {
            stmt: body.get_u32(),
            param_count: body.get_u16(),
        })
    }
}

/// Discriminated outcome of an execution.
///
/// The shape tag is the only authority on what a statement was; the client
/// never classifies from statement text.
#[derive(Debug)]
pub enum ExecShape {
    /// Schema-changing statement, no update count, no generated key.
    Ddl,
    /// Row-affecting statement.
    Dml {
        rows_affected: u64,
        generated_key: Option<GeneratedKey>,
    },
    /// Row-producing statement with an open server-side cursor.
    Query {
        cursor: u32,
        columns: Vec<ColumnDesc>,
    },
}

/// Answer to [`Execute`][crate::protocol::frontend::Execute].
#[derive(Debug)]
pub struct ExecuteAck {
    pub shape: ExecShape,
}

impl ExecuteAck {
    pub const OPCODE: u8 = 0x45;

    const SHAPE_DDL: u8 = 0;
    const SHAPE_DML: u8 = 1;
    const SHAPE_QUERY: u8 = 2;

    const KEY_NONE: u8 = 0;
    const KEY_INT: u8 = 1;
    const KEY_STR: u8 = 2;
    /// A generated identity the server reports at ordinal zero, surfaced
    /// as integer `0`.
    const KEY_ZERO: u8 = 3;
}

impl BackendProtocol for ExecuteAck {
    fn decode(opcode: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_opcode!(ExecuteAck, opcode);
        if body.remaining() < 1 {
            return Err(ProtocolError::malformed("ExecuteAck"));
        }
        let shape = match body.get_u8() {
            Self::SHAPE_DDL => ExecShape::Ddl,
            Self::SHAPE_DML => {
                if body.remaining() < 9 {
                    return Err(ProtocolError::malformed("ExecuteAck update count"));
                }
                let rows_affected = body.get_u64();
                let generated_key = match body.get_u8() {
                    Self::KEY_NONE => None,
                    Self::KEY_INT => {
                        if body.remaining() < 8 {
                            return Err(ProtocolError::malformed("generated key"));
                        }
                        Some(GeneratedKey::Int(body.get_i64()))
                    },
                    Self::KEY_STR => {
                        Some(GeneratedKey::Str(body.try_get_str()?.as_str().to_owned()))
                    },
                    Self::KEY_ZERO => Some(GeneratedKey::Int(0)),
                    tag => {
                        return Err(ProtocolError::new(format!(
                            "unknown generated key tag {tag:#04x}",
                        )));
                    },
                };
                ExecShape::Dml { rows_affected, generated_key }
            },
            Self::SHAPE_QUERY => {
                if body.remaining() < 6 {
                    return Err(ProtocolError::malformed("ExecuteAck cursor"));
                }
                let cursor = body.get_u32();
                let column_count = body.get_u16();
                let mut columns = Vec::with_capacity(column_count as usize);
                for _ in 0..column_count {
                    columns.push(ColumnDesc::read(&mut body)?);
                }
                ExecShape::Query { cursor, columns }
            },
            tag => {
                return Err(ProtocolError::new(format!(
                    "unknown execution shape {tag:#04x}",
                )));
            },
        };
        Ok(Self { shape })
    }
}

/// One batch of rows from an open cursor.
///
/// Cell payloads are decoded lazily against the cursor's descriptors.
#[derive(Debug)]
pub struct RowBatch {
    pub cursor: u32,
    pub row_count: u16,
    /// Set on the final batch; the server retires the cursor with it.
    pub exhausted: bool,
    pub body: Bytes,
}

impl RowBatch {
    pub const OPCODE: u8 = 0x46;
}

impl BackendProtocol for RowBatch {
    fn decode(opcode: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_opcode!(RowBatch, opcode);
        if body.remaining() < 7 {
            return Err(ProtocolError::malformed("RowBatch"));
        }
        Ok(Self {
            cursor: body.get_u32(),
            row_count: body.get_u16(),
            exhausted: body.get_u8() != 0,
            body,
        })
    }
}

/// A failure report, sent in place of whatever answer was expected.
///
/// The transport converts this into a [`DbError`] before callers see the
/// message, the code and text are passed through verbatim.
#[derive(Debug)]
pub struct Status {
    pub code: i32,
    pub sql_state: ByteStr,
    pub message: ByteStr,
}

impl Status {
    pub const OPCODE: u8 = 0x49;

    pub fn into_db_error(self) -> DbError {
        DbError::new(
            self.code,
            self.sql_state.as_str().to_owned(),
            self.message.as_str().to_owned(),
        )
    }
}

impl BackendProtocol for Status {
    fn decode(opcode: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_opcode!(Status, opcode);
        if body.remaining() < 4 {
            return Err(ProtocolError::malformed("Status"));
        }
        Ok(Self {
            code: body.get_i32(),
            sql_state: body.try_get_str()?,
            message: body.try_get_str()?,
        })
    }
}

macro_rules! unit_msg {
    ($(
        $(#[$doc:meta])* struct $name:ident, $op:literal;
    )*) => {$(
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name;

        impl $name {
            pub const OPCODE: u8 = $op;
        }

        impl BackendProtocol for $name {
            fn decode(opcode: u8, _: Bytes) -> Result<Self, ProtocolError> {
                if $name::OPCODE != opcode {
                    return Err(ProtocolError::unexpected(stringify!($name), $name::OPCODE, opcode));
                }
                Ok(Self)
            }
        }
    )*};
}

unit_msg! {
    /// Acknowledges a cursor or statement release.
    struct CloseAck, 0x47;

    /// Acknowledges a transaction boundary operation.
    struct TxAck, 0x48;

    /// Acknowledges an orderly shutdown.
    struct GoodbyeAck, 0x4A;
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::{BufMut, BytesMut};

    fn str_field(buf: &mut BytesMut, s: &str) {
        buf.put_u32(s.len() as u32);
        buf.put(s.as_bytes());
    }

    #[test]
    fn execute_ack_shapes() {
        // DDL carries nothing beyond the tag
        let ack = ExecuteAck::decode(ExecuteAck::OPCODE, Bytes::from_static(&[0])).unwrap();
        assert!(matches!(ack.shape, ExecShape::Ddl));

        // DML with integer key
        let mut buf = BytesMut::new();
        buf.put_u8(1);
        buf.put_u64(4);
        buf.put_u8(1);
        buf.put_i64(42);
        let ack = ExecuteAck::decode(ExecuteAck::OPCODE, buf.freeze()).unwrap();
        match ack.shape {
            ExecShape::Dml { rows_affected, generated_key } => {
                assert_eq!(rows_affected, 4);
                assert_eq!(generated_key, Some(GeneratedKey::Int(42)));
            },
            other => panic!("expected dml, got {other:?}"),
        }

        // zero-ordinal identity marker collapses to integer zero
        let mut buf = BytesMut::new();
        buf.put_u8(1);
        buf.put_u64(1);
        buf.put_u8(3);
        let ack = ExecuteAck::decode(ExecuteAck::OPCODE, buf.freeze()).unwrap();
        match ack.shape {
            ExecShape::Dml { generated_key, .. } => {
                assert_eq!(generated_key, Some(GeneratedKey::Int(0)));
            },
            other => panic!("expected dml, got {other:?}"),
        }
    }

    #[test]
    fn query_shape_passes_empty_column_names_through() {
        let mut buf = BytesMut::new();
        buf.put_u8(2);
        buf.put_u32(7); // cursor
        buf.put_u16(2);
        for _ in 0..2 {
            str_field(&mut buf, ""); // unnamed expression column
            buf.put_u8(0x02); // integer
            buf.put_u16(0);
            buf.put_u8(1);
        }
        let ack = ExecuteAck::decode(ExecuteAck::OPCODE, buf.freeze()).unwrap();
        match ack.shape {
            ExecShape::Query { cursor, columns } => {
                assert_eq!(cursor, 7);
                assert_eq!(columns.len(), 2);
                assert!(columns.iter().all(|c| c.name().is_empty()));
            },
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[test]
    fn status_keeps_message_verbatim() {
        let mut buf = BytesMut::new();
        buf.put_i32(-25);
        str_field(&mut buf, "42000");
        str_field(&mut buf, "table NOTAREALTABLE not found");
        let status = Status::decode(Status::OPCODE, buf.freeze()).unwrap();
        let err = status.into_db_error();
        assert_eq!(err.code(), -25);
        assert_eq!(err.message(), "table NOTAREALTABLE not found");
    }

    #[test]
    fn unknown_opcode() {
        assert!(BackendMessage::decode(0x7F, Bytes::new()).is_err());
    }
}
