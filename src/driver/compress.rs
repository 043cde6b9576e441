//! Block compression seam.
//!
//! The compression codec itself (LZ4 framing with checksums) lives outside
//! this crate; a connection only needs something that turns a raw block
//! body into compressed frames.

use bytes::BytesMut;
use std::fmt;
use std::io;

/// Compresses one serialized block body.
pub trait BlockCompressor: Send {
    /// Append the compressed frame(s) for `raw` to `out`.
    fn compress(&self, raw: &[u8], out: &mut BytesMut) -> io::Result<()>;
}

/// Compression preference of a connection.
#[derive(Default)]
pub enum Compression {
    #[default]
    Disabled,
    Enabled(Box<dyn BlockCompressor>),
}

impl Compression {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Compression::Enabled(_))
    }
}

impl fmt::Debug for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::Disabled => write!(f, "Disabled"),
            Compression::Enabled(_) => write!(f, "Enabled"),
        }
    }
}
