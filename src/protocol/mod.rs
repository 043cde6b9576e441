//! Native protocol wire encoding (pure, sync).
//!
//! No I/O here, just values → bytes.

pub mod binary;
pub mod block;
pub mod client_info;
pub mod consts;
pub mod error;
pub mod query;

pub use binary::{Decoder, Encoder};
pub use block::{Block, BlockInfo};
pub use client_info::ClientInfo;
pub use error::{DecodeError, EncodeError};
pub use query::QueryPacket;
