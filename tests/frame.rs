//! Query packet bytes as they reach the transport.

use bytes::BytesMut;
use pretty_assertions::assert_eq;
use std::io;

use chwire::driver::{BlockCompressor, Connection, ConnectionBuilder, ServerInfo};
use chwire::protocol::consts::LOOPBACK_PEER_ADDRESS;
use chwire::protocol::ClientInfo;

const EMPTY_BLOCK: [u8; 10] = [1, 0, 2, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0];

/// Marks the block body so the test can find it.
struct Tagged;

impl BlockCompressor for Tagged {
    fn compress(&self, raw: &[u8], out: &mut BytesMut) -> io::Result<()> {
        out.extend_from_slice(b"LZ");
        out.extend_from_slice(raw);
        Ok(())
    }
}

fn string(out: &mut Vec<u8>, s: &str) {
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

/// Bytes up to and including the ClientInfo revision.
fn prefix(query_id: &str) -> Vec<u8> {
    let mut out = vec![1];
    string(&mut out, query_id);
    out.push(1);
    string(&mut out, "");
    string(&mut out, "");
    string(&mut out, LOOPBACK_PEER_ADDRESS);
    out.push(1);
    string(&mut out, "host");
    string(&mut out, "host");
    string(&mut out, "chwire");
    out.extend_from_slice(&[1, 1, 0xC5, 0xA7, 0x03]);
    out
}

fn send(revision: u64, query_id: &str, query: &str) -> Vec<u8> {
    let mut conn = ConnectionBuilder::new()
        .hostname("host")
        .client_info(ClientInfo::default())
        .build(Vec::new(), ServerInfo::with_revision(revision))
        .unwrap();
    conn.send_query_with_id(query_id, query).unwrap();
    conn.into_inner()
}

#[test]
fn query_frame_with_quota_key() {
    let mut expected = prefix("");
    expected.push(0); // quota key
    expected.push(0); // settings
    expected.extend_from_slice(&[2, 0]);
    string(&mut expected, "SELECT 1");
    expected.extend_from_slice(&[2, 0]);
    expected.extend_from_slice(&EMPTY_BLOCK);

    assert_eq!(send(54213, "", "SELECT 1"), expected);
}

#[test]
fn query_frame_before_quota_key_revision() {
    let mut expected = prefix("");
    expected.push(0); // settings
    expected.extend_from_slice(&[2, 0]);
    string(&mut expected, "SELECT 1");
    expected.extend_from_slice(&[2, 0]);
    expected.extend_from_slice(&EMPTY_BLOCK);

    assert_eq!(send(54059, "", "SELECT 1"), expected);
}

#[test]
fn quota_key_revision_boundary() {
    let before = send(54059, "", "SELECT 1");
    let at = send(54060, "", "SELECT 1");
    assert_eq!(at.len(), before.len() + 1);

    let split = prefix("").len();
    assert_eq!(&at[..split], &before[..split]);
    assert_eq!(at[split], 0);
    assert_eq!(&at[split + 1..], &before[split..]);
}

#[test]
fn query_id_is_sent() {
    let bytes = send(54213, "q-42", "SELECT 1");
    assert_eq!(&bytes[..prefix("q-42").len()], prefix("q-42").as_slice());
}

#[test]
fn every_query_ends_with_empty_block() {
    for query in ["", "SELECT 1", "INSERT INTO t VALUES"] {
        let bytes = send(54213, "", query);
        assert_eq!(&bytes[bytes.len() - 12..bytes.len() - 10], &[2, 0]);
        assert_eq!(&bytes[bytes.len() - 10..], &EMPTY_BLOCK);
    }
}

#[test]
fn compressed_query_frame() {
    let mut conn = ConnectionBuilder::new()
        .hostname("host")
        .compress(true)
        .compressor(Tagged)
        .build(Vec::new(), ServerInfo::with_revision(54213))
        .unwrap();
    conn.send_query("SELECT 1").unwrap();
    let bytes = conn.into_inner();

    let flag = prefix("").len() + 3;
    assert_eq!(bytes[flag], 1);

    let mut tail = vec![2, 0, b'L', b'Z'];
    tail.extend_from_slice(&EMPTY_BLOCK);
    assert_eq!(&bytes[bytes.len() - tail.len()..], tail.as_slice());
}

#[test]
fn uncompressed_flag_is_zero() {
    let bytes = send(54213, "", "SELECT 1");
    assert_eq!(bytes[prefix("").len() + 3], 0);
}

#[test]
fn ping_and_cancel_opcodes() {
    let mut conn = Connection::new(Vec::new(), ServerInfo::with_revision(54213));
    conn.send_ping().unwrap();
    conn.send_cancel().unwrap();
    assert_eq!(conn.into_inner(), vec![4, 3]);
}

#[test]
fn compressed_query_frame_with_id() {
    let mut conn = ConnectionBuilder::new()
        .hostname("host")
        .compress(true)
        .compressor(Tagged)
        .build(Vec::new(), ServerInfo::with_revision(54213))
        .unwrap();
    conn.send_query_with_id("q-7", "SELECT 1").unwrap();
    let bytes = conn.into_inner();

    let prefix = prefix("q-7");
    assert_eq!(&bytes[..prefix.len()], prefix.as_slice());
    assert_eq!(bytes[prefix.len() + 3], 1);
    assert_eq!(&bytes[bytes.len() - 12..bytes.len() - 10], b"LZ");
}

/// Fails every block.
struct Broken;

impl BlockCompressor for Broken {
    fn compress(&self, _raw: &[u8], _out: &mut BytesMut) -> io::Result<()> {
        Err(io::Error::other("lz4 unavailable"))
    }
}

#[test]
fn aborted_frame_is_not_sent_later() {
    let mut conn = ConnectionBuilder::new()
        .compress(true)
        .compressor(Broken)
        .build(Vec::new(), ServerInfo::with_revision(54213))
        .unwrap();
    assert!(conn.send_query("SELECT 1").is_err());
    assert_eq!(conn.pending(), 0);

    conn.send_ping().unwrap();
    assert_eq!(conn.into_inner(), vec![4]);
}

/// Accepts writes, then fails the flush.
struct ClosedPeer(Vec<u8>);

impl io::Write for ClosedPeer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"))
    }
}

#[test]
fn flush_error_is_reported() {
    let mut conn = Connection::new(ClosedPeer(Vec::new()), ServerInfo::with_revision(54213));
    let err = conn.send_query("SELECT 1").unwrap_err();
    assert!(matches!(err, chwire::WireError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe));
}
