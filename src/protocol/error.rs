//! Encoding and decoding errors for the native wire format.
//!
//! Shared by the column codecs, `QueryEncoder` and the envelope reader.

use thiserror::Error;

/// Errors raised while turning a single value into wire bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The codec cannot write this kind of value at all.
    #[error("column {column} cannot encode a value of type {got}")]
    UnexpectedType { column: String, got: &'static str },

    /// The value kind is right but it does not fit the column width.
    #[error("value {value} is out of range for column {column}")]
    OutOfRange { column: String, value: String },

    /// FixedString input longer than the declared width.
    #[error("invalid length {len} for column {column} (max {max})")]
    InvalidLength { column: String, len: usize, max: usize },

    /// A date/time string that does not parse in the column timezone.
    #[error("invalid date/time '{0}'")]
    InvalidDateTime(String),
}

impl EncodeError {
    pub(crate) fn unexpected(column: impl Into<String>, got: &'static str) -> Self {
        Self::UnexpectedType {
            column: column.into(),
            got,
        }
    }

    pub(crate) fn out_of_range(column: impl Into<String>, value: impl ToString) -> Self {
        Self::OutOfRange {
            column: column.into(),
            value: value.to_string(),
        }
    }
}

/// Errors raised while reading wire bytes back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("varint overflows 64 bits")]
    VarintOverflow,

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EncodeError::unexpected("Int8", "String");
        assert_eq!(err.to_string(), "column Int8 cannot encode a value of type String");

        let err = DecodeError::UnexpectedEof {
            needed: 4,
            remaining: 1,
        };
        assert_eq!(
            err.to_string(),
            "unexpected end of input: needed 4 bytes, 1 remaining"
        );
    }
}
