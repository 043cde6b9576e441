//! Column codecs.
//!
//! A `Codec` writes one native value in the wire representation of exactly
//! one column type. Codecs are plain data (no state between writes), so a
//! single instance can be shared freely.

use bytes::BufMut;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

use super::timezone::Timezone;
use crate::protocol::{EncodeError, Encoder};

/// Borrowed scalar handed to a codec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(&'a str),
    DateTime(DateTime<FixedOffset>),
}

impl Value<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int8(_) => "Int8",
            Value::Int16(_) => "Int16",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::UInt8(_) => "UInt8",
            Value::UInt16(_) => "UInt16",
            Value::UInt32(_) => "UInt32",
            Value::UInt64(_) => "UInt64",
            Value::Float32(_) => "Float32",
            Value::Float64(_) => "Float64",
            Value::String(_) => "String",
            Value::DateTime(_) => "DateTime",
        }
    }

    /// Any integer variant, widened.
    fn integer(&self) -> Option<i128> {
        match *self {
            Value::Int8(v) => Some(v as i128),
            Value::Int16(v) => Some(v as i128),
            Value::Int32(v) => Some(v as i128),
            Value::Int64(v) => Some(v as i128),
            Value::UInt8(v) => Some(v as i128),
            Value::UInt16(v) => Some(v as i128),
            Value::UInt32(v) => Some(v as i128),
            Value::UInt64(v) => Some(v as i128),
            _ => None,
        }
    }
}

/// One codec per column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Codec {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    FixedString(usize),
    /// u16 days since 1970-01-01.
    Date { timezone: Timezone },
    /// u32 unix seconds. Without `is_full` only the calendar date (midnight in
    /// `timezone`) is kept.
    DateTime { timezone: Timezone, is_full: bool },
}

/// Widest `FixedString` the server accepts.
pub const MAX_FIXED_STRING_WIDTH: usize = 0xFF_FFFF;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

macro_rules! write_int {
    ($self:ident, $encoder:ident, $value:ident, $ty:ty, $put:ident) => {{
        let n = $value
            .integer()
            .ok_or_else(|| EncodeError::unexpected($self.to_string(), $value.kind()))?;
        let v = <$ty>::try_from(n).map_err(|_| EncodeError::out_of_range($self.to_string(), n))?;
        $encoder.$put(v);
        Ok(())
    }};
}

impl Codec {
    /// Write a single value.
    pub fn write<B: BufMut>(&self, encoder: &mut Encoder<B>, value: Value<'_>) -> Result<(), EncodeError> {
        match self {
            Codec::Int8 => write_int!(self, encoder, value, i8, i8),
            Codec::Int16 => write_int!(self, encoder, value, i16, i16),
            Codec::Int32 => write_int!(self, encoder, value, i32, i32),
            Codec::Int64 => write_int!(self, encoder, value, i64, i64),
            Codec::UInt8 => write_int!(self, encoder, value, u8, u8),
            Codec::UInt16 => write_int!(self, encoder, value, u16, u16),
            Codec::UInt32 => write_int!(self, encoder, value, u32, u32),
            Codec::UInt64 => write_int!(self, encoder, value, u64, u64),
            Codec::Float32 => match value {
                Value::Float32(v) => {
                    encoder.f32(v);
                    Ok(())
                }
                other => Err(EncodeError::unexpected("Float32", other.kind())),
            },
            Codec::Float64 => match value {
                Value::Float32(v) => {
                    encoder.f64(v as f64);
                    Ok(())
                }
                Value::Float64(v) => {
                    encoder.f64(v);
                    Ok(())
                }
                other => Err(EncodeError::unexpected("Float64", other.kind())),
            },
            Codec::String => match value {
                Value::String(s) => {
                    encoder.string(s);
                    Ok(())
                }
                other => Err(EncodeError::unexpected("String", other.kind())),
            },
            Codec::FixedString(width) => match value {
                _ if *width == 0 || *width > MAX_FIXED_STRING_WIDTH => {
                    Err(EncodeError::out_of_range(self.to_string(), width))
                }
                Value::String(s) if s.len() > *width => Err(EncodeError::InvalidLength {
                    column: self.to_string(),
                    len: s.len(),
                    max: *width,
                }),
                Value::String(s) => {
                    encoder.raw(s.as_bytes());
                    encoder.zeros(width - s.len());
                    Ok(())
                }
                other => Err(EncodeError::unexpected(self.to_string(), other.kind())),
            },
            Codec::Date { timezone } => {
                let date = match value {
                    Value::DateTime(dt) => timezone.to_zone(&dt).date_naive(),
                    Value::String(s) => parse_date(s)?,
                    other => {
                        let secs = other
                            .integer()
                            .ok_or_else(|| EncodeError::unexpected("Date", other.kind()))?;
                        let dt = i64::try_from(secs)
                            .ok()
                            .and_then(|secs| DateTime::from_timestamp(secs, 0))
                            .ok_or_else(|| EncodeError::out_of_range("Date", secs))?;
                        timezone.to_zone(&dt.fixed_offset()).date_naive()
                    }
                };
                let days = date.signed_duration_since(unix_epoch_date()).num_days();
                let days = u16::try_from(days).map_err(|_| EncodeError::out_of_range("Date", date))?;
                encoder.u16(days);
                Ok(())
            }
            Codec::DateTime { timezone, is_full } => {
                let secs = match value {
                    Value::DateTime(dt) if *is_full => dt.timestamp() as i128,
                    Value::DateTime(dt) => midnight(timezone, &dt)? as i128,
                    Value::String(s) => {
                        let dt = parse_datetime(timezone, s)?;
                        if *is_full {
                            dt.timestamp() as i128
                        } else {
                            midnight(timezone, &dt)? as i128
                        }
                    }
                    other => other
                        .integer()
                        .ok_or_else(|| EncodeError::unexpected(self.to_string(), other.kind()))?,
                };
                let secs = u32::try_from(secs).map_err(|_| EncodeError::out_of_range(self.to_string(), secs))?;
                encoder.u32(secs);
                Ok(())
            }
        }
    }

    /// Width in bytes of one encoded value, `None` for variable width.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Codec::Int8 | Codec::UInt8 => Some(1),
            Codec::Int16 | Codec::UInt16 | Codec::Date { .. } => Some(2),
            Codec::Int32 | Codec::UInt32 | Codec::Float32 | Codec::DateTime { .. } => Some(4),
            Codec::Int64 | Codec::UInt64 | Codec::Float64 => Some(8),
            Codec::FixedString(width) => Some(*width),
            Codec::String => None,
        }
    }
}

/// Column type name as the server spells it.
impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Int8 => write!(f, "Int8"),
            Codec::Int16 => write!(f, "Int16"),
            Codec::Int32 => write!(f, "Int32"),
            Codec::Int64 => write!(f, "Int64"),
            Codec::UInt8 => write!(f, "UInt8"),
            Codec::UInt16 => write!(f, "UInt16"),
            Codec::UInt32 => write!(f, "UInt32"),
            Codec::UInt64 => write!(f, "UInt64"),
            Codec::Float32 => write!(f, "Float32"),
            Codec::Float64 => write!(f, "Float64"),
            Codec::String => write!(f, "String"),
            Codec::FixedString(width) => write!(f, "FixedString({})", width),
            Codec::Date { .. } => write!(f, "Date"),
            Codec::DateTime {
                timezone: Timezone::Local,
                ..
            } => write!(f, "DateTime"),
            Codec::DateTime { timezone, .. } => write!(f, "DateTime('{}')", timezone),
        }
    }
}

fn unix_epoch_date() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

fn parse_date(s: &str) -> Result<NaiveDate, EncodeError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| EncodeError::InvalidDateTime(s.to_string()))
}

/// `YYYY-MM-DD hh:mm:ss` or `YYYY-MM-DD`, interpreted in `timezone`.
fn parse_datetime(timezone: &Timezone, s: &str) -> Result<DateTime<FixedOffset>, EncodeError> {
    let naive = match NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
        Ok(naive) => naive,
        Err(_) => parse_date(s)?.and_time(Default::default()),
    };
    timezone
        .from_local_datetime(&naive)
        .ok_or_else(|| EncodeError::InvalidDateTime(s.to_string()))
}

/// Unix seconds of midnight of `dt`'s calendar date in `timezone`.
fn midnight(timezone: &Timezone, dt: &DateTime<FixedOffset>) -> Result<i64, EncodeError> {
    let date = timezone.to_zone(dt).date_naive();
    timezone
        .from_local_datetime(&date.and_time(Default::default()))
        .map(|dt| dt.timestamp())
        .ok_or_else(|| EncodeError::InvalidDateTime(date.to_string()))
}
