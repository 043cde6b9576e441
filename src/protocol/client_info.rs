//! Client identity written into every query packet.

use bytes::BufMut;

use super::binary::Encoder;
use super::consts::DBMS_TCP_PROTOCOL_VERSION;

pub const DEFAULT_CLIENT_NAME: &str = "chwire";

/// Name, version and revision of this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub name: String,
    pub version_major: u64,
    pub version_minor: u64,
    pub revision: u64,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: DEFAULT_CLIENT_NAME.to_string(),
            version_major: 1,
            version_minor: 1,
            revision: DBMS_TCP_PROTOCOL_VERSION,
        }
    }
}

impl ClientInfo {
    /// Wire format: name (string), major, minor, revision (varints).
    pub fn write<B: BufMut>(&self, encoder: &mut Encoder<B>) {
        encoder.string(&self.name);
        encoder.uvarint(self.version_major);
        encoder.uvarint(self.version_minor);
        encoder.uvarint(self.revision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_info_layout() {
        let info = ClientInfo {
            name: "ab".to_string(),
            version_major: 1,
            version_minor: 2,
            revision: 300,
        };
        let mut enc: Encoder = Encoder::default();
        info.write(&mut enc);
        assert_eq!(enc.into_inner().as_ref(), &[2, b'a', b'b', 1, 2, 0xAC, 0x02]);
    }
}
