//! Homogeneous arrays.
//!
//! An `Array` is either a typed sequence plus its resolved codec, or a
//! construction error. The error is stored instead of returned so that
//! constructors hand back a plain `Array`; every operation checks it first
//! and returns it unchanged, without doing any work.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, FixedOffset, Utc};
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{Error as _, Serializer};
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::fmt;

use super::column::{Codec, Value};
use super::envelope;
use super::registry::{ElementType, Registry};
use super::timezone::{default_timezone, Timezone};
use super::TypeError;
use crate::protocol::binary::MAX_VARINT_LEN;
use crate::protocol::Encoder;

/// Upper bound for the buffer reserved up front by `Array::value`.
const MAX_PREALLOC: usize = 1 << 20;

/// A typed sequence of one registered element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
    DateTime(Vec<DateTime<FixedOffset>>),
}

macro_rules! values_from_vec {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for Values {
                fn from(v: Vec<$ty>) -> Self {
                    Values::$variant(v)
                }
            }
        )*

        impl Values {
            /// Wrap a `Vec<T>` whose element type the registry resolved to `ty`.
            fn from_registered<T: 'static>(ty: ElementType, values: Vec<T>) -> Option<Self> {
                let any: Box<dyn Any> = Box::new(values);
                // UTC datetimes are stored with a zero offset.
                let any = match any.downcast::<Vec<DateTime<Utc>>>() {
                    Ok(v) => return Some(Values::from(*v)),
                    Err(any) => any,
                };
                match ty {
                    $(ElementType::$variant => any.downcast::<Vec<$ty>>().ok().map(|v| Values::$variant(*v)),)*
                }
            }

            pub fn element_type(&self) -> ElementType {
                match self {
                    $(Values::$variant(_) => ElementType::$variant,)*
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(Values::$variant(v) => v.len(),)*
                }
            }
        }
    };
}

values_from_vec! {
    Int8 => i8,
    Int16 => i16,
    Int32 => i32,
    Int64 => i64,
    UInt8 => u8,
    UInt16 => u16,
    UInt32 => u32,
    UInt64 => u64,
    Float32 => f32,
    Float64 => f64,
    String => String,
    DateTime => DateTime<FixedOffset>,
}

impl From<Vec<DateTime<Utc>>> for Values {
    fn from(v: Vec<DateTime<Utc>>) -> Self {
        Values::DateTime(v.into_iter().map(|dt| dt.fixed_offset()).collect())
    }
}

impl Values {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value<'_>> {
        Some(match self {
            Values::Int8(v) => Value::Int8(*v.get(index)?),
            Values::Int16(v) => Value::Int16(*v.get(index)?),
            Values::Int32(v) => Value::Int32(*v.get(index)?),
            Values::Int64(v) => Value::Int64(*v.get(index)?),
            Values::UInt8(v) => Value::UInt8(*v.get(index)?),
            Values::UInt16(v) => Value::UInt16(*v.get(index)?),
            Values::UInt32(v) => Value::UInt32(*v.get(index)?),
            Values::UInt64(v) => Value::UInt64(*v.get(index)?),
            Values::Float32(v) => Value::Float32(*v.get(index)?),
            Values::Float64(v) => Value::Float64(*v.get(index)?),
            Values::String(v) => Value::String(v.get(index)?),
            Values::DateTime(v) => Value::DateTime(*v.get(index)?),
        })
    }

    /// Elements in order.
    pub fn iter(&self) -> impl Iterator<Item = Value<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Timezone carried by the values themselves: the first datetime's offset.
    fn own_timezone(&self) -> Option<Timezone> {
        match self {
            Values::DateTime(v) => v.first().map(|dt| Timezone::Fixed(*dt.offset())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ArrayState {
    Valid { values: Values, codec: Codec },
    Failed(TypeError),
}

/// A homogeneous array and its codec, or a sticky construction error.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    state: ArrayState,
}

impl Array {
    /// Build from a native `Vec<T>`, resolving the codec by `T`.
    ///
    /// Element types without a registered codec produce an array holding
    /// `TypeError::UnsupportedArrayType`.
    pub fn new<T: 'static>(values: Vec<T>) -> Self {
        let registered = Registry::global()
            .element_type_of::<T>()
            .and_then(|ty| Values::from_registered(ty, values));

        match registered {
            Some(values) => Self::from_values(values),
            None => Self::failed(TypeError::UnsupportedArrayType(type_name::<Vec<T>>().to_string())),
        }
    }

    /// Build from already typed values.
    pub fn from_values(values: Values) -> Self {
        let codec = Registry::global().codec(values.element_type(), values.own_timezone());
        match codec {
            Some(codec) => Self::valid(values, codec),
            None => Self::failed(TypeError::UnsupportedArrayType(
                values.element_type().rust_name().to_string(),
            )),
        }
    }

    /// Build with a codec resolved from a declared column type name.
    ///
    /// The codec is not checked against the values here; a mismatch shows up
    /// as an encode error from `value` or `write_array`.
    pub fn with_type(type_name: &str, values: impl Into<Values>) -> Self {
        let values = values.into();
        let timezone = values.own_timezone().unwrap_or_else(default_timezone);
        match Registry::global().factory(type_name, timezone) {
            Ok(codec) => Self::valid(values, codec),
            Err(err) => Self::failed(err),
        }
    }

    /// Rebuild from a persisted envelope. Decode failures are stored on the
    /// returned array.
    pub fn from_envelope(bytes: &[u8]) -> Self {
        match envelope::decode(bytes) {
            Ok(values) => Self::from_values(values),
            Err(err) => {
                tracing::debug!(error = %err, "array envelope rejected");
                Self::failed(err)
            }
        }
    }

    fn valid(values: Values, codec: Codec) -> Self {
        Self {
            state: ArrayState::Valid { values, codec },
        }
    }

    fn failed(err: TypeError) -> Self {
        Self {
            state: ArrayState::Failed(err),
        }
    }

    fn parts(&self) -> Result<(&Values, &Codec), TypeError> {
        match &self.state {
            ArrayState::Valid { values, codec } => Ok((values, codec)),
            ArrayState::Failed(err) => Err(err.clone()),
        }
    }

    pub fn error(&self) -> Option<&TypeError> {
        match &self.state {
            ArrayState::Failed(err) => Some(err),
            ArrayState::Valid { .. } => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error().is_none()
    }

    pub fn values(&self) -> Result<&Values, TypeError> {
        self.parts().map(|(values, _)| values)
    }

    pub fn codec(&self) -> Result<&Codec, TypeError> {
        self.parts().map(|(_, codec)| codec)
    }

    pub fn len(&self) -> Result<usize, TypeError> {
        self.values().map(Values::len)
    }

    pub fn element_type(&self) -> Result<ElementType, TypeError> {
        self.values().map(Values::element_type)
    }

    /// Standalone wire encoding: varint element count, then every element
    /// through the array's codec.
    pub fn value(&self) -> Result<Bytes, TypeError> {
        let (values, codec) = self.parts()?;
        let len = values.len();
        let capacity = codec
            .fixed_width()
            .unwrap_or(2)
            .saturating_mul(len)
            .min(MAX_PREALLOC)
            + MAX_VARINT_LEN;

        let mut enc = Encoder::new(BytesMut::with_capacity(capacity));
        enc.uvarint(len as u64);
        for value in values.iter() {
            codec.write(&mut enc, value)?;
        }
        Ok(enc.into_inner().freeze())
    }

    /// Write the elements only (no count) with a codec chosen by the caller,
    /// e.g. the element codec of an enclosing `Array(T)` column.
    ///
    /// Returns the number of elements written.
    pub fn write_array<B: BufMut>(&self, encoder: &mut Encoder<B>, codec: &Codec) -> Result<u64, TypeError> {
        let (values, _) = self.parts()?;
        for value in values.iter() {
            codec.write(encoder, value)?;
        }
        Ok(values.len() as u64)
    }

    /// Persisted, self-describing encoding.
    pub fn to_envelope(&self) -> Result<Vec<u8>, TypeError> {
        let (values, _) = self.parts()?;
        Ok(envelope::encode(values))
    }
}

impl From<Values> for Array {
    fn from(values: Values) -> Self {
        Array::from_values(values)
    }
}

impl Serialize for Array {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = self.to_envelope().map_err(S::Error::custom)?;
        serializer.serialize_bytes(&bytes)
    }
}

impl<'de> Deserialize<'de> for Array {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(EnvelopeVisitor)
    }
}

struct EnvelopeVisitor;

impl<'de> Visitor<'de> for EnvelopeVisitor {
    type Value = Array;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("array envelope bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Array, E> {
        Ok(Array::from_envelope(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Array, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        Ok(Array::from_envelope(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Decoder, EncodeError};

    #[test]
    fn test_new_resolves_codec() {
        let array = Array::new(vec![1i32, 2, 3]);
        assert!(array.is_valid());
        assert_eq!(array.codec().unwrap(), &Codec::Int32);
        assert_eq!(array.element_type().unwrap(), ElementType::Int32);
        assert_eq!(array.values().unwrap(), &Values::Int32(vec![1, 2, 3]));
    }

    #[test]
    fn test_new_unsupported_type() {
        let array = Array::new(vec![true, false]);
        let err = TypeError::UnsupportedArrayType("alloc::vec::Vec<bool>".to_string());
        assert_eq!(array.error(), Some(&err));
        assert_eq!(array.value(), Err(err.clone()));
        assert_eq!(array.to_envelope(), Err(err.clone()));
        assert_eq!(array.len(), Err(err));
    }

    #[test]
    fn test_value_layout() {
        let bytes = Array::new(vec![1u16, 2]).value().unwrap();
        assert_eq!(bytes.as_ref(), &[2, 1, 0, 2, 0]);

        let bytes = Array::new(vec!["a".to_string(), "bc".to_string()]).value().unwrap();
        assert_eq!(bytes.as_ref(), &[2, 1, b'a', 2, b'b', b'c']);
    }

    #[test]
    fn test_value_count_prefix() {
        let array = Array::new((0..300).map(|i| i as u8).collect::<Vec<_>>());
        let bytes = array.value().unwrap();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.uvarint().unwrap(), 300);
        assert_eq!(dec.remaining(), 300);
    }

    #[test]
    fn test_empty_array_value() {
        let bytes = Array::new(Vec::<f64>::new()).value().unwrap();
        assert_eq!(bytes.as_ref(), &[0]);
    }

    #[test]
    fn test_write_array_uses_given_codec() {
        let array = Array::new(vec![1i8, -1]);
        let mut enc: Encoder = Encoder::default();
        let count = array.write_array(&mut enc, &Codec::Int16).unwrap();
        assert_eq!(count, 2);
        assert_eq!(enc.into_inner().as_ref(), &[1, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_write_array_failed_writes_nothing() {
        let array = Array::new(vec![(); 3]);
        let mut enc: Encoder = Encoder::default();
        assert!(array.write_array(&mut enc, &Codec::Int8).is_err());
        assert!(enc.into_inner().is_empty());
    }

    #[test]
    fn test_with_type() {
        let array = Array::with_type("UInt8", vec![1i64, 2]);
        assert_eq!(array.codec().unwrap(), &Codec::UInt8);
        assert_eq!(array.value().unwrap().as_ref(), &[2, 1, 2]);
    }

    #[test]
    fn test_with_type_unknown_name_is_sticky() {
        let array = Array::with_type("Decimal(9, 2)", vec![1i64]);
        let err = TypeError::UnsupportedType("Decimal(9, 2)".to_string());
        assert_eq!(array.error(), Some(&err));
        assert_eq!(array.value(), Err(err.clone()));
        assert_eq!(array.value(), Err(err));
    }

    #[test]
    fn test_with_type_element_mismatch_discards_buffer() {
        let array = Array::with_type("Int8", vec!["x".to_string()]);
        assert!(array.is_valid());
        assert_eq!(
            array.value(),
            Err(TypeError::Encode(EncodeError::unexpected("Int8", "String")))
        );
    }

    #[test]
    fn test_datetime_codec_uses_value_offset() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let dt = DateTime::from_timestamp(0, 0).unwrap().with_timezone(&offset);
        let array = Array::new(vec![dt]);
        assert_eq!(
            array.codec().unwrap(),
            &Codec::DateTime {
                timezone: Timezone::Fixed(offset),
                is_full: true
            }
        );
    }

    #[test]
    fn test_utc_datetimes_are_registered() {
        let dt = DateTime::from_timestamp(1_704_067_200, 0).unwrap();
        let array = Array::new(vec![dt]);
        assert_eq!(array.element_type().unwrap(), ElementType::DateTime);
        assert_eq!(
            array.codec().unwrap(),
            &Codec::DateTime {
                timezone: Timezone::utc(),
                is_full: true
            }
        );
        assert_eq!(array.value().unwrap().as_ref(), &[1, 0x80, 0x00, 0x92, 0x65]);
    }

    #[test]
    fn test_huge_fixed_string_width_is_rejected() {
        let array = Array::with_type("FixedString(18446744073709551615)", vec!["a".to_string()]);
        assert_eq!(
            array.error(),
            Some(&TypeError::UnsupportedType("FixedString(18446744073709551615)".to_string()))
        );

        let array = Array::valid(
            Values::String(vec!["a".to_string(), "b".to_string()]),
            Codec::FixedString(usize::MAX),
        );
        assert!(matches!(array.value(), Err(TypeError::Encode(EncodeError::OutOfRange { .. }))));
    }

    #[test]
    fn test_envelope_round_trip() {
        let array = Array::new(vec![1.5f32, -2.25]);
        let restored = Array::from_envelope(&array.to_envelope().unwrap());
        assert_eq!(restored, array);
    }

    #[test]
    fn test_from_envelope_stores_error() {
        let array = Array::from_envelope(b"CHA\x01\x63\x00");
        let err = TypeError::UnsupportedArrayType("envelope type id 99".to_string());
        assert_eq!(array.error(), Some(&err));
        assert_eq!(array.value(), Err(err));
    }

    #[test]
    fn test_serde_json_round_trip() {
        let array = Array::new(vec!["x".to_string()]);
        let json = serde_json::to_string(&array).unwrap();
        let restored: Array = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, array);
    }

    #[test]
    fn test_serialize_failed_array_errors() {
        let array = Array::new(vec!['c']);
        assert!(serde_json::to_string(&array).is_err());
    }
}
