//! Column codecs, the codec registry, and `Array`.

pub mod array;
pub mod column;
pub mod envelope;
pub mod registry;
pub mod timezone;

pub use array::{Array, Values};
pub use column::{Codec, Value};
pub use registry::{ElementType, Registry};
pub use timezone::{default_timezone, set_default_timezone, Timezone};

use thiserror::Error;

use crate::protocol::{DecodeError, EncodeError};

/// Errors attached to an `Array` or raised while resolving a codec.
///
/// `Clone` so an `Array` can hand out its stored error on every call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// No codec is registered for this sequence type.
    #[error("unsupported array type {0}")]
    UnsupportedArrayType(String),

    /// Declared column type name is unknown or malformed.
    #[error("unsupported column type '{0}'")]
    UnsupportedType(String),

    #[error("unsupported timezone '{0}'")]
    UnsupportedTimezone(String),

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u64),

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("envelope decode failed: {0}")]
    Decode(#[from] DecodeError),
}
