//! The [`Value`] sum type.
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, Utc};

/// A single SQL value moving between the application and the wire.
///
/// Parameters are built from native types through the `From` impls below,
/// fetched cells are copied out through [`Decode`][crate::row::Decode]
/// implementations; the codec holds no references once a row is delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// All integer column widths travel as 64-bit.
    Int(i64),
    Double(f64),
    Float(f32),
    /// Exact decimal digits as text, never routed through floating point.
    Decimal(String),
    /// Variable or fixed width string, server-applied padding preserved.
    Str(String),
    /// Raw bytes, round-trips byte-for-byte.
    Bytes(Vec<u8>),
    /// Timezone-local midnight of the represented instant.
    Date(DateTime<FixedOffset>),
    /// Wall-clock time of day in the session timezone.
    Time(NaiveTime),
    /// An absolute instant carrying an explicit UTC offset.
    Timestamp(DateTime<FixedOffset>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Value kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Double(_) => "double",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Str(_) => "string",
            Self::Bytes(_) => "blob",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Value {
            fn from($pat: $ty) -> Self {
                $body
            }
        }
    };
}

from!(<()>_ => Self::Null);
from!(<bool>v => Self::Bool(v));
from!(<i16>v => Self::Int(v.into()));
from!(<i32>v => Self::Int(v.into()));
from!(<i64>v => Self::Int(v));
from!(<f32>v => Self::Float(v));
from!(<f64>v => Self::Double(v));
from!(<&str>v => Self::Str(v.into()));
from!(<String>v => Self::Str(v));
from!(<&[u8]>v => Self::Bytes(v.into()));
from!(<Vec<u8>>v => Self::Bytes(v));
from!(<NaiveTime>v => Self::Time(v));
from!(<DateTime<FixedOffset>>v => Self::Timestamp(v));
from!(<DateTime<Utc>>v => Self::Timestamp(v.fixed_offset()));
from!(<DateTime<Local>>v => Self::Timestamp(v.fixed_offset()));

impl From<NaiveDate> for Value {
    /// A bare date is carried as utc midnight, the server reinterprets it
    /// against the declared column type.
    fn from(v: NaiveDate) -> Self {
        let midnight = v.and_time(NaiveTime::MIN).and_utc();
        Self::Date(midnight.fixed_offset())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}
