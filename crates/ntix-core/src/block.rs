//! Index blocks: the non-resident nodes stored in `$INDEX_ALLOCATION`.
//!
//! ## Block Layout
//!
//! ```text
//! +0x00  "INDX" signature
//! +0x04  u16  update sequence array offset
//! +0x06  u16  update sequence array count
//! +0x08  u64  log file sequence number
//! +0x10  u64  VCN of this block (index clusters)
//! +0x18  index header, followed by the entries
//! ```
//!
//! Fixups are applied by the record decoder before the bytes reach us.

use crate::error::{IndexError, Result};
use crate::header::{IndexEntries, IndexHeader};
use crate::types::Vcn;
use crate::view::ByteView;
use std::sync::Arc;

/// Expected signature of every index block
pub const INDEX_BLOCK_SIGNATURE: &[u8; 4] = b"INDX";

/// Offset of the index header within a block
pub const INDEX_BLOCK_HEADER_OFFSET: usize = 0x18;

/// One physical index node read from the allocation stream.
///
/// Blocks are ephemeral: they are built fresh on every read and dropped once
/// the traversal has moved past them. Entries obtained from [`entries`] keep
/// the underlying buffer alive on their own.
///
/// [`entries`]: IndexBlock::entries
#[derive(Debug, Clone)]
pub struct IndexBlock {
    buffer: Arc<[u8]>,
    offset: usize,
    lsn: u64,
    vcn: Vcn,
    header: IndexHeader,
}

impl IndexBlock {
    /// Parse the block starting at `offset` in `buffer`.
    ///
    /// `block_size` bounds the node: no entry may extend past
    /// `offset + block_size`.
    pub fn parse(buffer: Arc<[u8]>, offset: usize, block_size: usize) -> Result<Self> {
        let limit = offset.saturating_add(block_size).min(buffer.len());
        let view = ByteView::new(&buffer[..limit], offset);

        let signature = view.bytes(0x00, 4)?;
        if signature != INDEX_BLOCK_SIGNATURE {
            return Err(IndexError::corrupt(format!(
                "index block at offset {} has signature {:02X?}, expected {:?}",
                offset, signature, "INDX"
            )));
        }

        let lsn = view.u64(0x08)?;
        let vcn = Vcn(view.i64(0x10)?);
        let header = IndexHeader::parse(view.at(INDEX_BLOCK_HEADER_OFFSET))?;

        Ok(IndexBlock {
            buffer,
            offset,
            lsn,
            vcn,
            header,
        })
    }

    /// The VCN this block records for itself
    pub fn index_block_vcn(&self) -> Vcn {
        self.vcn
    }

    pub fn log_file_sequence_number(&self) -> u64 {
        self.lsn
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    /// Byte offset of the block within the buffer it was read into
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Iterate the entries of this block in on-disk order.
    pub fn entries(&self) -> IndexEntries {
        self.header
            .entries(self.buffer.clone(), self.offset + INDEX_BLOCK_HEADER_OFFSET)
    }
}
