//! Native protocol constants.
//!
//! Reference: https://github.com/ClickHouse/ClickHouse/blob/master/src/Core/Protocol.h

/// Client -> server packet opcodes.
pub mod client {
    pub const HELLO: u64 = 0;
    pub const QUERY: u64 = 1;
    pub const DATA: u64 = 2;
    pub const CANCEL: u64 = 3;
    pub const PING: u64 = 4;
}

/// Query processing stage. Only `COMPLETE` is ever sent.
pub mod stage {
    pub const FETCH_COLUMNS: u64 = 0;
    pub const WITH_MERGEABLE_STATE: u64 = 1;
    pub const COMPLETE: u64 = 2;
}

/// Compression flag of the query packet.
pub mod compression {
    pub const DISABLE: u64 = 0;
    pub const ENABLE: u64 = 1;
}

/// ClientInfo query kind.
pub mod query_kind {
    pub const NO_QUERY: u64 = 0;
    pub const INITIAL_QUERY: u64 = 1;
    pub const SECONDARY_QUERY: u64 = 2;
}

/// ClientInfo interface.
pub mod interface {
    pub const TCP: u64 = 1;
    pub const HTTP: u64 = 2;
}

/// Peer address placeholder sent as the initial address.
pub const LOOPBACK_PEER_ADDRESS: &str = "[::ffff:127.0.0.1]:0";

/// Revision this client speaks.
pub const DBMS_TCP_PROTOCOL_VERSION: u64 = 54213;

pub const DBMS_MIN_REVISION_WITH_CLIENT_INFO: u64 = 54032;
pub const DBMS_MIN_REVISION_WITH_SERVER_TIMEZONE: u64 = 54058;
pub const DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO: u64 = 54060;
