//! Typed value codec between the wire's tagged binary format and [`Value`].
//!
//! Values are self-describing: a tag byte, then a tag-specific payload.
//! Temporal payloads carry an absolute instant plus an explicit UTC offset;
//! on decode the instant is re-expressed in the session timezone, so two
//! sessions configured with different zones observe the same stored instant
//! as different wall-clock fields.
use bytes::{Buf, BufMut, Bytes};
use chrono::{DateTime, NaiveTime};

use crate::{
    error::DbError,
    ext::{BufMutExt, WireLenExt},
    protocol::ProtocolError,
    sqltype::ColumnDesc,
    session::SessionZone,
    value::Value,
};

/// Tag byte of the type-tagged null marker.
pub(crate) const NULL_TAG: u8 = 0x00;

/// Declared-type byte carried by a null parameter whose column type is
/// unknown to the client.
const UNTYPED: u8 = 0x00;

fn value_tag(value: &Value) -> u8 {
    use crate::sqltype::SqlType as T;
    match value {
        Value::Null => NULL_TAG,
        Value::Bool(_) => T::Boolean.tag(),
        Value::Int(_) => T::Integer.tag(),
        Value::Double(_) => T::Double.tag(),
        Value::Float(_) => T::Float.tag(),
        Value::Decimal(_) => T::Decimal.tag(),
        Value::Str(_) => T::String.tag(),
        Value::Bytes(_) => T::Bytes.tag(),
        Value::Date(_) => T::Date.tag(),
        Value::Time(_) => T::Time.tag(),
        Value::Timestamp(_) => T::Timestamp.tag(),
    }
}

/// Wire size of one encoded parameter, tag byte included.
pub(crate) fn encoded_len(value: &Value) -> u32 {
    1 + match value {
        Value::Null => 1,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Double(_) => 8,
        Value::Float(_) => 4,
        Value::Decimal(s) | Value::Str(s) => s.wire_len(),
        Value::Bytes(b) => b[..].wire_len(),
        Value::Date(_) => 8 + 4,
        Value::Time(_) => 8 + 4,
        Value::Timestamp(_) => 8 + 4,
    }
}

/// Cheap local format checks before a parameter is put on the wire.
///
/// Value-dependent failures the client cannot pre-validate (numeric-string
/// coercion, declared-scale overflow) surface from the server's execution
/// response instead.
pub(crate) fn check_param(value: &Value) -> Result<(), DbError> {
    if let Value::Decimal(text) = value {
        if !is_decimal_literal(text) {
            return Err(DbError::conversion(format!(
                "invalid decimal literal {text:?}",
            )));
        }
    }
    Ok(())
}

fn is_decimal_literal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (unsigned, ""),
    };
    !(int.is_empty() && frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

/// Encode one parameter into its tagged wire form.
///
/// A null parameter encodes to the type-tagged null marker, not an empty
/// payload. Must write exactly [`encoded_len`] bytes.
pub(crate) fn encode_param(value: &Value, buf: &mut impl BufMut) {
    buf.put_u8(value_tag(value));
    match value {
        Value::Null => buf.put_u8(UNTYPED),
        Value::Bool(b) => buf.put_u8(*b as u8),
        Value::Int(i) => buf.put_i64(*i),
        Value::Double(d) => buf.put_f64(*d),
        Value::Float(fl) => buf.put_f32(*fl),
        Value::Decimal(s) | Value::Str(s) => buf.put_str(s),
        Value::Bytes(b) => buf.put_blob(b),
        Value::Date(dt) => {
            buf.put_i64(dt.timestamp());
            buf.put_i32(dt.offset().local_minus_utc());
        },
        Value::Time(t) => {
            let micros = t
                .signed_duration_since(NaiveTime::MIN)
                .num_microseconds()
                .unwrap_or(0);
            buf.put_i64(micros);
            buf.put_i32(0);
        },
        Value::Timestamp(dt) => {
            buf.put_i64(dt.timestamp_micros());
            buf.put_i32(dt.offset().local_minus_utc());
        },
    }
}

/// Decode one column cell against its declared type.
///
/// The cell is self-describing; a tag that matches neither the null marker
/// nor the declared type means the server and client disagree on the
/// result-set layout.
pub(crate) fn decode_column(
    buf: &mut Bytes,
    col: &ColumnDesc,
    zone: &SessionZone,
) -> Result<Value, ProtocolError> {
    use crate::sqltype::SqlType as T;

    if buf.remaining() < 1 {
        return Err(ProtocolError::malformed("value tag"));
    }
    let tag = buf.get_u8();

    if tag == NULL_TAG {
        if buf.remaining() < 1 {
            return Err(ProtocolError::malformed("null marker"));
        }
        buf.advance(1); // declared-type byte
        return Ok(Value::Null);
    }

    if tag != col.ty().tag() {
        return Err(ProtocolError::new(format!(
            "value tag {tag:#04x} does not match declared column type {}",
            col.ty().name(),
        )));
    }

    use crate::ext::BufExt;

    Ok(match col.ty() {
        T::Boolean => Value::Bool(checked_u8(buf)? != 0),
        T::Integer => Value::Int(checked_i64(buf)?),
        T::Double => Value::Double(f64::from_bits(checked_i64(buf)? as u64)),
        T::Float => Value::Float(f32::from_bits(checked_u32(buf)?)),
        T::Decimal => Value::Decimal(buf.try_get_str()?.as_str().to_owned()),
        T::String | T::FixedString => Value::Str(buf.try_get_str()?.as_str().to_owned()),
        T::Bytes => Value::Bytes(buf.try_get_blob()?.to_vec()),
        T::Date => {
            let (secs, _offset) = checked_instant(buf)?;
            let utc = DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| ProtocolError::new("date instant out of range"))?;
            Value::Date(zone.local_midnight(utc))
        },
        T::Time => {
            let (micros, _offset) = checked_instant(buf)?;
            let micros = micros.rem_euclid(86_400_000_000);
            let time = NaiveTime::from_num_seconds_from_midnight_opt(
                (micros / 1_000_000) as u32,
                ((micros % 1_000_000) * 1_000) as u32,
            )
            .ok_or_else(|| ProtocolError::new("time of day out of range"))?;
            Value::Time(time)
        },
        T::Timestamp => {
            let (micros, _offset) = checked_instant(buf)?;
            let utc = DateTime::from_timestamp_micros(micros)
                .ok_or_else(|| ProtocolError::new("timestamp instant out of range"))?;
            Value::Timestamp(zone.resolve(utc))
        },
    })
}

fn checked_u8(buf: &mut Bytes) -> Result<u8, ProtocolError> {
    if buf.remaining() < 1 {
        return Err(ProtocolError::malformed("value payload"));
    }
    Ok(buf.get_u8())
}

fn checked_u32(buf: &mut Bytes) -> Result<u32, ProtocolError> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::malformed("value payload"));
    }
    Ok(buf.get_u32())
}

fn checked_i64(buf: &mut Bytes) -> Result<i64, ProtocolError> {
    if buf.remaining() < 8 {
        return Err(ProtocolError::malformed("value payload"));
    }
    Ok(buf.get_i64())
}

/// Instant payload: 64-bit quantity plus the explicit UTC offset.
fn checked_instant(buf: &mut Bytes) -> Result<(i64, i32), ProtocolError> {
    if buf.remaining() < 12 {
        return Err(ProtocolError::malformed("instant payload"));
    }
    Ok((buf.get_i64(), buf.get_i32()))
}

#[cfg(test)]
mod test {
    use bytes::BytesMut;
    use chrono::{FixedOffset, TimeZone, Timelike, Utc};

    use super::*;
    use crate::sqltype::SqlType;

    fn col(ty: SqlType) -> ColumnDesc {
        ColumnDesc::new("c", ty, 0, true)
    }

    fn roundtrip(value: Value, ty: SqlType) -> Value {
        let mut buf = BytesMut::new();
        encode_param(&value, &mut buf);
        assert_eq!(buf.len() as u32, encoded_len(&value));
        let mut bytes = buf.freeze();
        let out = decode_column(&mut bytes, &col(ty), &SessionZone::Local).unwrap();
        assert!(bytes.is_empty(), "trailing bytes after decode");
        out
    }

    #[test]
    fn scalar_roundtrip() {
        assert_eq!(roundtrip(Value::Bool(true), SqlType::Boolean), Value::Bool(true));
        assert_eq!(roundtrip(Value::Int(-12345), SqlType::Integer), Value::Int(-12345));
        assert_eq!(
            roundtrip(Value::Int(2938746529387465), SqlType::Integer),
            Value::Int(2938746529387465),
        );
        assert_eq!(
            roundtrip(Value::Double(std::f64::consts::PI), SqlType::Double),
            Value::Double(std::f64::consts::PI),
        );
        assert_eq!(
            roundtrip(Value::Float(std::f32::consts::PI), SqlType::Float),
            Value::Float(std::f32::consts::PI),
        );
        assert_eq!(
            roundtrip(Value::Str("Hello, 世界".into()), SqlType::String),
            Value::Str("Hello, 世界".into()),
        );
        assert_eq!(
            roundtrip(Value::Bytes(vec![10, 20, 30, 40]), SqlType::Bytes),
            Value::Bytes(vec![10, 20, 30, 40]),
        );
    }

    #[test]
    fn decimal_is_exact_text() {
        let digits = "3.1415926535897932384626433832795028841";
        assert_eq!(
            roundtrip(Value::Decimal(digits.into()), SqlType::Decimal),
            Value::Decimal(digits.into()),
        );
    }

    #[test]
    fn null_is_type_tagged() {
        let mut buf = BytesMut::new();
        encode_param(&Value::Null, &mut buf);
        assert_eq!(&buf[..], &[NULL_TAG, UNTYPED]);
        let mut bytes = buf.freeze();
        let out = decode_column(&mut bytes, &col(SqlType::Integer), &SessionZone::Local).unwrap();
        assert_eq!(out, Value::Null);
    }

    #[test]
    fn decimal_literal_check() {
        for ok in ["0", "-1", "+1.5", "3.1416", ".5", "55.0", "123456789012345678901234567890"] {
            assert!(check_param(&Value::Decimal(ok.into())).is_ok(), "{ok}");
        }
        for bad in ["", ".", "1,5", "1e5", "NotAnInt", "--2", "1.2.3"] {
            let err = check_param(&Value::Decimal(bad.into())).unwrap_err();
            assert_eq!(err.code(), crate::error::CONVERSION_ERROR, "{bad}");
        }
    }

    #[test]
    fn timestamp_reexpressed_in_session_zone() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 15, 17, 30, 0).unwrap();
        let value = Value::Timestamp(instant.fixed_offset());

        let tokyo = SessionZone::named("Asia/Tokyo").unwrap();
        let la = SessionZone::named("America/Los_Angeles").unwrap();

        let mut buf = BytesMut::new();
        encode_param(&value, &mut buf);
        let mut a = buf.clone().freeze();
        let mut b = buf.freeze();

        let Value::Timestamp(in_tokyo) =
            decode_column(&mut a, &col(SqlType::Timestamp), &tokyo).unwrap()
        else {
            panic!("expected timestamp")
        };
        let Value::Timestamp(in_la) =
            decode_column(&mut b, &col(SqlType::Timestamp), &la).unwrap()
        else {
            panic!("expected timestamp")
        };

        // same instant, different wall clock
        assert_eq!(in_tokyo.timestamp(), instant.timestamp());
        assert_eq!(in_la.timestamp(), instant.timestamp());
        assert_eq!(in_tokyo.hour(), 2); // next day 02:30 JST
        assert_eq!(in_la.hour(), 10); // same day 10:30 PDT
        assert_ne!(in_tokyo.offset(), in_la.offset());
    }

    #[test]
    fn date_truncates_to_local_midnight() {
        // 17:30 UTC is already the next day in Tokyo
        let instant = Utc.with_ymd_and_hms(2025, 6, 15, 17, 30, 0).unwrap();
        let tokyo = SessionZone::named("Asia/Tokyo").unwrap();

        let mut buf = BytesMut::new();
        encode_param(&Value::Date(instant.fixed_offset()), &mut buf);
        let mut bytes = buf.freeze();

        let Value::Date(date) = decode_column(&mut bytes, &col(SqlType::Date), &tokyo).unwrap()
        else {
            panic!("expected date")
        };
        assert_eq!(date.date_naive().to_string(), "2025-06-16");
        assert_eq!((date.hour(), date.minute(), date.second()), (0, 0, 0));
    }

    #[test]
    fn tag_mismatch_is_rejected() {
        let mut buf = BytesMut::new();
        encode_param(&Value::Int(7), &mut buf);
        let mut bytes = buf.freeze();
        let err = decode_column(&mut bytes, &col(SqlType::String), &SessionZone::Local);
        assert!(err.is_err());
    }

    #[test]
    fn fixed_string_padding_passes_through() {
        let padded = Value::Str("X  ".into());
        let mut buf = BytesMut::new();
        encode_param(&padded, &mut buf);
        // fixed and variable strings share the payload shape, only tags differ
        let mut bytes = {
            let mut raw = buf.to_vec();
            raw[0] = SqlType::FixedString.tag();
            Bytes::from(raw)
        };
        let out =
            decode_column(&mut bytes, &col(SqlType::FixedString), &SessionZone::Local).unwrap();
        assert_eq!(out, Value::Str("X  ".into()));
    }

    #[test]
    fn offset_zero_timestamp() {
        let dt = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(1970, 1, 1, 0, 0, 0)
            .unwrap();
        let mut buf = BytesMut::new();
        encode_param(&Value::Timestamp(dt), &mut buf);
        // tag, instant micros 0, offset 0
        assert_eq!(&buf[..], &[0x0B, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }
}
