//! Declared SQL column types and result-set descriptors.
use bytes::Bytes;

use crate::{
    ext::BufExt,
    protocol::ProtocolError,
};

/// Declared SQL type of a column or parameter.
///
/// The same tag bytes describe values on the wire, see [`Value`][crate::Value].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Boolean,
    /// 64-bit integer, also carries the smaller integer column widths.
    Integer,
    Double,
    Float,
    /// Arbitrary precision decimal, exchanged as exact decimal text.
    Decimal,
    /// Variable length string.
    String,
    /// Fixed width string, right-padded by the server.
    FixedString,
    Bytes,
    Date,
    Time,
    Timestamp,
}

impl SqlType {
    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::Boolean => 0x01,
            Self::Integer => 0x02,
            Self::Double => 0x03,
            Self::Float => 0x04,
            Self::Decimal => 0x05,
            Self::String => 0x06,
            Self::FixedString => 0x07,
            Self::Bytes => 0x08,
            Self::Date => 0x09,
            Self::Time => 0x0A,
            Self::Timestamp => 0x0B,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Result<Self, ProtocolError> {
        Ok(match tag {
            0x01 => Self::Boolean,
            0x02 => Self::Integer,
            0x03 => Self::Double,
            0x04 => Self::Float,
            0x05 => Self::Decimal,
            0x06 => Self::String,
            0x07 => Self::FixedString,
            0x08 => Self::Bytes,
            0x09 => Self::Date,
            0x0A => Self::Time,
            0x0B => Self::Timestamp,
            _ => return Err(ProtocolError::new(format!("unknown type tag {tag:#04x}"))),
        })
    }

    /// Type name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::FixedString => "char",
            Self::Bytes => "blob",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
        }
    }
}

/// Result-set column descriptor, fixed for a cursor's lifetime.
#[derive(Debug, Clone)]
pub struct ColumnDesc {
    name: String,
    ty: SqlType,
    scale: u16,
    nullable: bool,
}

impl ColumnDesc {
    /// Column name as reported by the server.
    ///
    /// May be empty for a literal or an expression without an alias,
    /// empty names are passed through unchanged, never synthesized.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared SQL type.
    pub fn ty(&self) -> SqlType {
        self.ty
    }

    /// Declared decimal scale, zero for non-decimal columns.
    pub fn scale(&self) -> u16 {
        self.scale
    }

    /// Whether the column admits NULL.
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// Read one descriptor from an `ExecuteAck` body.
    pub(crate) fn read(body: &mut Bytes) -> Result<Self, ProtocolError> {
        use bytes::Buf;
        let name = body.try_get_str()?.as_str().to_owned();
        if body.remaining() < 4 {
            return Err(ProtocolError::malformed("column descriptor"));
        }
        let ty = SqlType::from_tag(body.get_u8())?;
        let scale = body.get_u16();
        let nullable = body.get_u8() != 0;
        Ok(Self { name, ty, scale, nullable })
    }

    #[cfg(test)]
    pub(crate) fn new(name: &str, ty: SqlType, scale: u16, nullable: bool) -> Self {
        Self { name: name.into(), ty, scale, nullable }
    }
}
