//! Persisted array envelope.
//!
//! A self-describing encoding of `Values` for storage outside a connection
//! (parameter values, caches, files). Unlike the column wire format it keeps
//! everything needed to rebuild the exact values, including datetime offsets
//! and sub-second precision.
//!
//! Layout:
//! - magic `b"CHA"`
//! - version (varint), currently 1
//! - element type id (varint, `ElementType::id`)
//! - element count (varint)
//! - elements: numbers fixed-width LE, strings length-prefixed UTF-8,
//!   datetimes as `i64` seconds + `u32` nanoseconds + `i32` offset seconds
//!
//! Decoders reject versions and type ids they do not know rather than guess.

use chrono::{DateTime, FixedOffset};

use super::array::Values;
use super::registry::ElementType;
use super::TypeError;
use crate::protocol::{Decoder, Encoder};

pub const MAGIC: &[u8; 3] = b"CHA";
pub const VERSION: u64 = 1;

/// Encode values into a standalone envelope.
pub fn encode(values: &Values) -> Vec<u8> {
    let mut enc = Encoder::new(Vec::with_capacity(MAGIC.len() + 8 + values.len() * 8));
    enc.raw(MAGIC);
    enc.uvarint(VERSION);
    enc.uvarint(values.element_type().id());
    enc.uvarint(values.len() as u64);

    match values {
        Values::Int8(v) => v.iter().for_each(|x| enc.i8(*x)),
        Values::Int16(v) => v.iter().for_each(|x| enc.i16(*x)),
        Values::Int32(v) => v.iter().for_each(|x| enc.i32(*x)),
        Values::Int64(v) => v.iter().for_each(|x| enc.i64(*x)),
        Values::UInt8(v) => enc.raw(v),
        Values::UInt16(v) => v.iter().for_each(|x| enc.u16(*x)),
        Values::UInt32(v) => v.iter().for_each(|x| enc.u32(*x)),
        Values::UInt64(v) => v.iter().for_each(|x| enc.u64(*x)),
        Values::Float32(v) => v.iter().for_each(|x| enc.f32(*x)),
        Values::Float64(v) => v.iter().for_each(|x| enc.f64(*x)),
        Values::String(v) => v.iter().for_each(|s| enc.string(s)),
        Values::DateTime(v) => v.iter().for_each(|dt| {
            enc.i64(dt.timestamp());
            enc.u32(dt.timestamp_subsec_nanos());
            enc.i32(dt.offset().local_minus_utc());
        }),
    }

    enc.into_inner()
}

/// Decode an envelope back into values.
pub fn decode(bytes: &[u8]) -> Result<Values, TypeError> {
    let mut dec = Decoder::new(bytes);

    if dec.raw(MAGIC.len())? != MAGIC {
        return Err(TypeError::InvalidEnvelope("bad magic".to_string()));
    }

    let version = dec.uvarint()?;
    if version != VERSION {
        return Err(TypeError::UnsupportedVersion(version));
    }

    let id = dec.uvarint()?;
    let ty = ElementType::from_id(id)
        .ok_or_else(|| TypeError::UnsupportedArrayType(format!("envelope type id {}", id)))?;

    let count = dec.uvarint()?;
    // Every element takes at least one byte; anything larger is corrupt.
    if count > dec.remaining() as u64 {
        return Err(TypeError::InvalidEnvelope(format!(
            "element count {} exceeds payload of {} bytes",
            count,
            dec.remaining()
        )));
    }
    let count = count as usize;

    macro_rules! read_all {
        ($variant:ident, $read:ident) => {
            Values::$variant((0..count).map(|_| dec.$read()).collect::<Result<_, _>>()?)
        };
    }

    let values = match ty {
        ElementType::Int8 => read_all!(Int8, i8),
        ElementType::Int16 => read_all!(Int16, i16),
        ElementType::Int32 => read_all!(Int32, i32),
        ElementType::Int64 => read_all!(Int64, i64),
        ElementType::UInt8 => Values::UInt8(dec.raw(count)?.to_vec()),
        ElementType::UInt16 => read_all!(UInt16, u16),
        ElementType::UInt32 => read_all!(UInt32, u32),
        ElementType::UInt64 => read_all!(UInt64, u64),
        ElementType::Float32 => read_all!(Float32, f32),
        ElementType::Float64 => read_all!(Float64, f64),
        ElementType::String => read_all!(String, string),
        ElementType::DateTime => {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(read_datetime(&mut dec)?);
            }
            Values::DateTime(out)
        }
    };

    dec.finish()?;
    Ok(values)
}

fn read_datetime(dec: &mut Decoder<'_>) -> Result<DateTime<FixedOffset>, TypeError> {
    let secs = dec.i64()?;
    let nanos = dec.u32()?;
    let offset = dec.i32()?;

    let offset = FixedOffset::east_opt(offset)
        .ok_or_else(|| TypeError::InvalidEnvelope(format!("invalid utc offset {}", offset)))?;
    let utc = DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| TypeError::InvalidEnvelope(format!("invalid timestamp {}.{}", secs, nanos)))?;
    Ok(utc.with_timezone(&offset))
}
