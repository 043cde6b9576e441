//! # chwire
//!
//! Write side of the ClickHouse native TCP protocol: query packets, data
//! blocks, and typed arrays of column values.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use chwire::prelude::*;
//!
//! let mut conn = ConnectionBuilder::new()
//!     .hostname("worker-1")
//!     .build(stream, ServerInfo::with_revision(54213))?;
//! conn.send_query("SELECT 1")?;
//!
//! let ids = Array::new(vec![1i32, 2, 3]);
//! let bytes = ids.value()?; // varint count + 3 x Int32
//! ```
//!
//! ## Layout
//!
//! | Module     | Purpose                                         |
//! |------------|-------------------------------------------------|
//! | `protocol` | varints, strings, packets (no I/O)              |
//! | `types`    | column codecs, codec registry, `Array`          |
//! | `driver`   | `Connection` over any `std::io::Write`          |
//! | `config`   | client identity and defaults from TOML          |

pub mod config;
pub mod driver;
pub mod error;
pub mod parser;
pub mod protocol;
pub mod types;

pub use driver::{Connection, ConnectionBuilder, ServerInfo};
pub use error::{WireError, WireResult};
pub use types::{Array, TypeError};

pub mod prelude {
    pub use crate::config::ClientConfig;
    pub use crate::driver::{BlockCompressor, Connection, ConnectionBuilder, ServerInfo};
    pub use crate::error::*;
    pub use crate::protocol::{ClientInfo, Encoder};
    pub use crate::types::{Array, Codec, ElementType, Registry, Timezone, TypeError, Value, Values};
}
