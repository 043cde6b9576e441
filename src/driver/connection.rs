//! Native protocol connection (write side).
//!
//! Wraps an already established, handshaken transport. Packets are staged
//! in a write buffer and reach the transport only on flush.
//!
//! Not safe for concurrent use: every method takes `&mut self`, one packet
//! at a time.

use bytes::BytesMut;
use std::io::Write;

use super::compress::{BlockCompressor, Compression};
use crate::config::{local_hostname, ClientConfig};
use crate::error::{WireError, WireResult};
use crate::protocol::consts::client;
use crate::protocol::query::write_data_header;
use crate::protocol::{Block, ClientInfo, Encoder, QueryPacket};
use crate::types::Timezone;

/// Initial write buffer capacity.
pub(crate) const BUFFER_CAPACITY: usize = 4096;

/// What the server told us in its hello packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version_major: u64,
    pub version_minor: u64,
    /// Negotiated revision; gates optional packet fields.
    pub revision: u64,
    pub timezone: Option<Timezone>,
}

impl ServerInfo {
    pub fn with_revision(revision: u64) -> Self {
        Self {
            name: String::new(),
            version_major: 0,
            version_minor: 0,
            revision,
            timezone: None,
        }
    }
}

/// A connection's packet writer.
pub struct Connection<S: Write> {
    stream: S,
    encoder: Encoder<BytesMut>,
    client_info: ClientInfo,
    server_info: ServerInfo,
    hostname: String,
    compression: Compression,
}

impl<S: Write> Connection<S> {
    /// Connection with default client info and no compression.
    pub fn new(stream: S, server_info: ServerInfo) -> Self {
        Self {
            stream,
            encoder: Encoder::new(BytesMut::with_capacity(BUFFER_CAPACITY)),
            client_info: ClientInfo::default(),
            server_info,
            hostname: local_hostname(),
            compression: Compression::Disabled,
        }
    }

    /// Send a query packet followed by an empty data block, then flush.
    pub fn send_query(&mut self, query: &str) -> WireResult<()> {
        self.send_query_with_id("", query)
    }

    /// Same as `send_query` with an explicit query id.
    ///
    /// If the data block cannot be written the whole packet is dropped from
    /// the write buffer; nothing of it reaches the transport.
    pub fn send_query_with_id(&mut self, query_id: &str, query: &str) -> WireResult<()> {
        tracing::debug!(query_id, revision = self.server_info.revision, "[send query] {}", query);
        let start = self.pending();

        QueryPacket {
            query_id,
            query,
            hostname: &self.hostname,
            client_info: &self.client_info,
            revision: self.server_info.revision,
            compress: self.compression.is_enabled(),
        }
        .write(&mut self.encoder);

        if let Err(e) = self.write_block(&Block::empty()) {
            tracing::warn!(error = %e, "query packet aborted before flush");
            self.encoder.get_mut().truncate(start);
            return Err(e);
        }
        self.flush()
    }

    /// Ask the server to cancel the running query.
    pub fn send_cancel(&mut self) -> WireResult<()> {
        tracing::debug!("[send cancel]");
        self.encoder.uvarint(client::CANCEL);
        self.flush()
    }

    pub fn send_ping(&mut self) -> WireResult<()> {
        tracing::trace!("[send ping]");
        self.encoder.uvarint(client::PING);
        self.flush()
    }

    /// Data packet: header, then the block body (compressed when enabled).
    fn write_block(&mut self, block: &Block) -> WireResult<()> {
        write_data_header(&mut self.encoder, "");

        match &self.compression {
            Compression::Disabled => block.write(&mut self.encoder),
            Compression::Enabled(compressor) => {
                let mut raw = Encoder::new(BytesMut::new());
                block.write(&mut raw);
                compressor
                    .compress(&raw.into_inner(), self.encoder.get_mut())
                    .map_err(WireError::Compression)?;
            }
        }
        Ok(())
    }

    /// Write staged bytes to the transport and flush it.
    pub fn flush(&mut self) -> WireResult<()> {
        let staged = self.encoder.get_mut().split();
        tracing::trace!(bytes = staged.len(), "flush");
        self.stream.write_all(&staged)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Bytes staged but not yet flushed.
    pub fn pending(&self) -> usize {
        self.encoder.get_ref().len()
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn client_info(&self) -> &ClientInfo {
        &self.client_info
    }

    pub fn is_compressed(&self) -> bool {
        self.compression.is_enabled()
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Builder for `Connection`.
///
/// # Example
/// ```ignore
/// let mut conn = ConnectionBuilder::new()
///     .config(&ClientConfig::load()?)
///     .hostname("worker-1")
///     .build(stream, server_info)?;
/// conn.send_query("SELECT 1")?;
/// ```
#[derive(Default)]
pub struct ConnectionBuilder {
    client_info: Option<ClientInfo>,
    hostname: Option<String>,
    compress: bool,
    compressor: Option<Box<dyn BlockCompressor>>,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take client identity, host name and compression preference from a
    /// config.
    pub fn config(mut self, config: &ClientConfig) -> Self {
        self.client_info = Some(config.client_info());
        self.hostname = config.hostname.clone();
        self.compress = config.compress;
        self
    }

    pub fn client_info(mut self, info: ClientInfo) -> Self {
        self.client_info = Some(info);
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Compressor used when compression is on.
    pub fn compressor(mut self, compressor: impl BlockCompressor + 'static) -> Self {
        self.compressor = Some(Box::new(compressor));
        self
    }

    pub fn build<S: Write>(self, stream: S, server_info: ServerInfo) -> WireResult<Connection<S>> {
        let compression = match (self.compress, self.compressor) {
            (false, _) => Compression::Disabled,
            (true, Some(compressor)) => Compression::Enabled(compressor),
            (true, None) => {
                return Err(WireError::config(
                    "compression enabled but no block compressor configured",
                ));
            }
        };

        let mut conn = Connection::new(stream, server_info);
        conn.compression = compression;
        if let Some(info) = self.client_info {
            conn.client_info = info;
        }
        if let Some(hostname) = self.hostname {
            conn.hostname = hostname;
        }
        Ok(conn)
    }
}
