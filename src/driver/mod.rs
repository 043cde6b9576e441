//! Synchronous connection driver.

pub mod compress;
pub mod connection;

pub use compress::{BlockCompressor, Compression};
pub use connection::{Connection, ConnectionBuilder, ServerInfo};
