//! Client query packet encoder.
//!
//! Pure, synchronous: writes the query packet header into a buffer. The
//! trailing empty data block and the flush belong to the driver, which owns
//! the compressor and the transport.
//!
//! Field order is fixed by the server and gated by the negotiated revision;
//! any deviation breaks the connection.

use bytes::BufMut;

use super::binary::Encoder;
use super::client_info::ClientInfo;
use super::consts::{
    client, compression, interface, query_kind, stage, DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO,
    LOOPBACK_PEER_ADDRESS,
};

/// Everything a query packet needs besides the buffer.
#[derive(Debug, Clone, Copy)]
pub struct QueryPacket<'a> {
    pub query_id: &'a str,
    pub query: &'a str,
    pub hostname: &'a str,
    pub client_info: &'a ClientInfo,
    /// Server revision negotiated at handshake.
    pub revision: u64,
    pub compress: bool,
}

impl QueryPacket<'_> {
    /// Wire format:
    /// - opcode `ClientQuery`, query id
    /// - client info preamble: kind, initial user, initial query id,
    ///   initial address, interface, os user hostname, client hostname
    /// - `ClientInfo` fields
    /// - quota key (revision >= 54060 only)
    /// - settings (empty), stage, compression flag, query text
    pub fn write<B: BufMut>(&self, encoder: &mut Encoder<B>) {
        encoder.uvarint(client::QUERY);
        encoder.string(self.query_id);

        encoder.uvarint(query_kind::INITIAL_QUERY);
        encoder.string(""); // initial user
        encoder.string(""); // initial query id
        encoder.string(LOOPBACK_PEER_ADDRESS);
        encoder.uvarint(interface::TCP);
        encoder.string(self.hostname);
        encoder.string(self.hostname);

        self.client_info.write(encoder);

        if has_quota_key(self.revision) {
            encoder.string("");
        }

        encoder.string(""); // settings
        encoder.uvarint(stage::COMPLETE);
        encoder.uvarint(compression_flag(self.compress));
        encoder.string(self.query);
    }
}

/// Whether the server expects a quota key after the client info.
#[inline]
pub fn has_quota_key(revision: u64) -> bool {
    revision >= DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO
}

#[inline]
pub fn compression_flag(compress: bool) -> u64 {
    if compress {
        compression::ENABLE
    } else {
        compression::DISABLE
    }
}

/// Header of a client data packet: opcode and temporary table name.
pub fn write_data_header<B: BufMut>(encoder: &mut Encoder<B>, table: &str) {
    encoder.uvarint(client::DATA);
    encoder.string(table);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_info() -> ClientInfo {
        ClientInfo {
            name: "c".to_string(),
            version_major: 1,
            version_minor: 1,
            revision: 54213,
        }
    }

    fn encode(revision: u64, compress: bool, query: &str) -> Vec<u8> {
        let info = client_info();
        let packet = QueryPacket {
            query_id: "",
            query,
            hostname: "h",
            client_info: &info,
            revision,
            compress,
        };
        let mut enc: Encoder = Encoder::default();
        packet.write(&mut enc);
        enc.into_inner().to_vec()
    }

    /// Everything up to and including the client info.
    fn prefix() -> Vec<u8> {
        let mut bytes = vec![1, 0]; // opcode, query id
        bytes.extend_from_slice(&[1, 0, 0]); // kind, user, initial id
        bytes.push(LOOPBACK_PEER_ADDRESS.len() as u8);
        bytes.extend_from_slice(LOOPBACK_PEER_ADDRESS.as_bytes());
        bytes.push(1); // TCP
        bytes.extend_from_slice(&[1, b'h', 1, b'h']);
        bytes.extend_from_slice(&[1, b'c', 1, 1, 0xC5, 0xA7, 0x03]);
        bytes
    }

    #[test]
    fn test_query_packet_without_quota_key() {
        let mut expected = prefix();
        expected.extend_from_slice(&[0, 2, 0]); // settings, stage, compression
        expected.push(8);
        expected.extend_from_slice(b"SELECT 1");

        assert_eq!(encode(54059, false, "SELECT 1"), expected);
    }

    #[test]
    fn test_query_packet_with_quota_key() {
        let mut expected = prefix();
        expected.push(0); // quota key
        expected.extend_from_slice(&[0, 2, 0]);
        expected.push(8);
        expected.extend_from_slice(b"SELECT 1");

        assert_eq!(encode(54060, false, "SELECT 1"), expected);
    }

    #[test]
    fn test_quota_key_adds_exactly_one_byte() {
        let before = encode(DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO - 1, false, "x");
        let after = encode(DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO, false, "x");
        assert_eq!(after.len(), before.len() + 1);
    }

    #[test]
    fn test_compression_flag() {
        for query in ["SELECT 1", "", "INSERT INTO t VALUES"] {
            let on = encode(54213, true, query);
            let off = encode(54213, false, query);
            let flag_at = prefix().len() + 1 + 2; // quota key, settings, stage
            assert_eq!(on[flag_at], 1);
            assert_eq!(off[flag_at], 0);
        }
    }

    #[test]
    fn test_data_header() {
        let mut enc: Encoder = Encoder::default();
        write_data_header(&mut enc, "");
        assert_eq!(enc.into_inner().as_ref(), &[2, 0]);
    }
}
