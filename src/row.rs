//! Fetched row access.
//!
//! - [`Row`]
//! - [`Decode`]
//! - [`RowIndex`]
//! - [`DecodeError`]
use std::{borrow::Cow, fmt, sync::Arc};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::{
    sqltype::ColumnDesc,
    value::Value,
};

/// One fetched row.
///
/// Values are owned copies; nothing borrows from the wire buffer once a row
/// is delivered. Descriptors are shared with the producing cursor.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[ColumnDesc]>,
    values: Box<[Value]>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[ColumnDesc]>, values: Box<[Value]>) -> Self {
        Self { columns, values }
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the row contains no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column descriptors, fixed for the producing cursor's lifetime.
    pub fn columns(&self) -> &[ColumnDesc] {
        &self.columns
    }

    /// Raw values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get and convert a column by position or name.
    ///
    /// A mismatch between the requested native type and the stored value
    /// surfaces as a conversion error.
    pub fn try_get<I: RowIndex, T: Decode>(&self, index: I) -> Result<T, DecodeError> {
        let nth = index.position(&self.columns)?;
        T::decode(&self.values[nth], &self.columns[nth])
    }
}

/// Type that can be used for indexing a row's column.
pub trait RowIndex: Sized + sealed::Sealed {
    /// Resolve to a column position.
    fn position(self, columns: &[ColumnDesc]) -> Result<usize, DecodeError>;
}

impl RowIndex for usize {
    fn position(self, columns: &[ColumnDesc]) -> Result<usize, DecodeError> {
        match self < columns.len() {
            true => Ok(self),
            false => Err(DecodeError::IndexOutOfBounds(self)),
        }
    }
}

impl RowIndex for &str {
    fn position(self, columns: &[ColumnDesc]) -> Result<usize, DecodeError> {
        columns
            .iter()
            .position(|c| c.name() == self)
            .ok_or_else(|| DecodeError::ColumnNotFound(String::from(self).into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
}

/// A native type that can be extracted from a fetched [`Value`].
pub trait Decode: Sized {
    /// Try to convert the stored value into self.
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError>;
}

fn mismatch<T>(value: &Value, col: &ColumnDesc, expected: &'static str) -> Result<T, DecodeError> {
    if value.is_null() {
        return Err(DecodeError::Null { column: col.name().into() });
    }
    Err(DecodeError::TypeMismatch {
        column: col.name().into(),
        expected,
        got: value.kind(),
    })
}

impl Decode for Value {
    fn decode(value: &Value, _: &ColumnDesc) -> Result<Self, DecodeError> {
        Ok(value.clone())
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
        match value.is_null() {
            true => Ok(None),
            false => T::decode(value, col).map(Some),
        }
    }
}

impl Decode for bool {
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
        match value {
            Value::Bool(b) => Ok(*b),
            v => mismatch(v, col, "boolean"),
        }
    }
}

impl Decode for i64 {
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
        match value {
            Value::Int(i) => Ok(*i),
            v => mismatch(v, col, "integer"),
        }
    }
}

macro_rules! decode_narrow_int {
    ($($ty:ty),*) => {$(
        impl Decode for $ty {
            fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
                match value {
                    Value::Int(i) => <$ty>::try_from(*i).map_err(|_| DecodeError::OutOfRange {
                        column: col.name().into(),
                        target: stringify!($ty),
                    }),
                    v => mismatch(v, col, "integer"),
                }
            }
        }
    )*};
}

decode_narrow_int!(i8, i16, i32, u32);

impl Decode for f64 {
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
        match value {
            Value::Double(d) => Ok(*d),
            Value::Float(fl) => Ok((*fl).into()),
            Value::Int(i) => Ok(*i as f64),
            v => mismatch(v, col, "double"),
        }
    }
}

impl Decode for f32 {
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
        match value {
            Value::Float(fl) => Ok(*fl),
            v => mismatch(v, col, "float"),
        }
    }
}

impl Decode for String {
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
        match value {
            Value::Str(s) | Value::Decimal(s) => Ok(s.clone()),
            v => mismatch(v, col, "string"),
        }
    }
}

impl Decode for Vec<u8> {
    /// A nullable blob read back as NULL yields an empty vec here;
    /// "value present but empty" is distinguished only by the column's
    /// nullability contract, scan [`Option<Vec<u8>>`] to tell them apart.
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Null => Ok(Vec::new()),
            v => mismatch(v, col, "blob"),
        }
    }
}

impl Decode for NaiveDate {
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
        match value {
            Value::Date(dt) => Ok(dt.date_naive()),
            v => mismatch(v, col, "date"),
        }
    }
}

impl Decode for NaiveTime {
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
        match value {
            Value::Time(t) => Ok(*t),
            v => mismatch(v, col, "time"),
        }
    }
}

impl Decode for DateTime<FixedOffset> {
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
        match value {
            Value::Timestamp(dt) | Value::Date(dt) => Ok(*dt),
            v => mismatch(v, col, "timestamp"),
        }
    }
}

impl Decode for DateTime<Utc> {
    fn decode(value: &Value, col: &ColumnDesc) -> Result<Self, DecodeError> {
        DateTime::<FixedOffset>::decode(value, col).map(|dt| dt.with_timezone(&Utc))
    }
}

/// An error when converting a fetched value into a native type.
pub enum DecodeError {
    /// Column requested by name not found.
    ColumnNotFound(Cow<'static, str>),
    /// Column position is out of bounds.
    IndexOutOfBounds(usize),
    /// Stored value kind does not fit the requested type.
    TypeMismatch {
        column: String,
        expected: &'static str,
        got: &'static str,
    },
    /// Stored integer does not fit the narrower target.
    OutOfRange {
        column: String,
        target: &'static str,
    },
    /// Value is NULL and the target is not optional.
    Null { column: String },
}

impl std::error::Error for DecodeError { }

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(i) => write!(f, "index out of bounds: {i}"),
            Self::TypeMismatch { column, expected, got } => {
                write!(f, "column {column:?} holds {got}, requested {expected}")
            },
            Self::OutOfRange { column, target } => {
                write!(f, "column {column:?} value does not fit {target}")
            },
            Self::Null { column } => write!(f, "unexpected NULL value in column {column:?}"),
        }
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sqltype::SqlType;

    fn row() -> Row {
        let columns: Arc<[ColumnDesc]> = vec![
            ColumnDesc::new("ID", SqlType::Integer, 0, false),
            ColumnDesc::new("STR", SqlType::String, 0, true),
            ColumnDesc::new("DEC", SqlType::Decimal, 4, true),
            ColumnDesc::new("BLO", SqlType::Bytes, 0, true),
        ]
        .into();
        Row::new(
            columns,
            vec![
                Value::Int(2),
                Value::Null,
                Value::Decimal("3.1416".into()),
                Value::Null,
            ]
            .into_boxed_slice(),
        )
    }

    #[test]
    fn get_by_position_and_name() {
        let row = row();
        assert_eq!(row.try_get::<_, i64>(0).unwrap(), 2);
        assert_eq!(row.try_get::<_, i64>("ID").unwrap(), 2);
        assert_eq!(row.try_get::<_, String>("DEC").unwrap(), "3.1416");
    }

    #[test]
    fn null_handling() {
        let row = row();
        assert_eq!(row.try_get::<_, Option<String>>("STR").unwrap(), None);
        assert!(row.try_get::<_, String>("STR").is_err());
        // nullable blob read back as NULL yields empty, not an error
        assert_eq!(row.try_get::<_, Vec<u8>>("BLO").unwrap(), Vec::<u8>::new());
        assert_eq!(row.try_get::<_, Option<Vec<u8>>>("BLO").unwrap(), None);
    }

    #[test]
    fn type_mismatch_is_reported() {
        let row = row();
        let err = row.try_get::<_, bool>("ID").unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { .. }));
    }

    #[test]
    fn narrowing_checks_range() {
        let columns: Arc<[ColumnDesc]> =
            vec![ColumnDesc::new("BIG", SqlType::Integer, 0, false)].into();
        let row = Row::new(columns, vec![Value::Int(i64::MAX)].into_boxed_slice());
        assert!(matches!(
            row.try_get::<_, i32>("BIG").unwrap_err(),
            DecodeError::OutOfRange { .. },
        ));
    }

    #[test]
    fn unknown_column() {
        let err = row().try_get::<_, i64>("NOPE").unwrap_err();
        assert!(matches!(err, DecodeError::ColumnNotFound(_)));
        let err = row().try_get::<_, i64>(9).unwrap_err();
        assert!(matches!(err, DecodeError::IndexOutOfBounds(9)));
    }
}
