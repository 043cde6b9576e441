//! Data block framing.
//!
//! Only the empty block is produced here: it terminates a query packet and
//! tells the server no inline rows follow.

use bytes::BufMut;

use super::binary::Encoder;

/// Block info header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub is_overflows: bool,
    /// `-1` when the block does not belong to a bucket.
    pub bucket_num: i32,
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self {
            is_overflows: false,
            bucket_num: -1,
        }
    }
}

impl BlockInfo {
    /// Wire format:
    /// - field 1 tag (varint), is_overflows (u8)
    /// - field 2 tag (varint), bucket_num (i32 LE)
    /// - end marker (varint 0)
    pub fn write<B: BufMut>(&self, encoder: &mut Encoder<B>) {
        encoder.uvarint(1);
        encoder.bool(self.is_overflows);
        encoder.uvarint(2);
        encoder.i32(self.bucket_num);
        encoder.uvarint(0);
    }
}

/// A columnar block with no columns and no rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub info: BlockInfo,
}

impl Block {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn num_columns(&self) -> u64 {
        0
    }

    pub fn num_rows(&self) -> u64 {
        0
    }

    /// Block body: info header, column count, row count.
    pub fn write<B: BufMut>(&self, encoder: &mut Encoder<B>) {
        self.info.write(encoder);
        encoder.uvarint(self.num_columns());
        encoder.uvarint(self.num_rows());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_block_bytes() {
        let mut enc: Encoder = Encoder::default();
        Block::empty().write(&mut enc);
        assert_eq!(
            enc.into_inner().as_ref(),
            &[1, 0, 2, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0]
        );
    }
}
