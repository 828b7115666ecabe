//! Index node header and the per-node entry iterator.

use crate::entry::IndexEntry;
use crate::error::{IndexError, Result};
use crate::view::ByteView;
use std::iter::FusedIterator;
use std::sync::Arc;

/// Size of the index node header fields plus reserved padding
pub const INDEX_HEADER_SIZE: usize = 0x10;

/// Header flag: the node has child nodes in the allocation
const HAS_CHILDREN_FLAG: u8 = 0x01;

/// Describes the entries region of a node.
///
/// Offsets are relative to the start of the header itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    first_entry_offset: u32,
    used_size: u32,
    allocated_size: u32,
    flags: u8,
}

impl IndexHeader {
    /// Parse a header located at the base of `view`.
    pub fn parse(view: ByteView<'_>) -> Result<Self> {
        let header = IndexHeader {
            first_entry_offset: view.u32(0x00)?,
            used_size: view.u32(0x04)?,
            allocated_size: view.u32(0x08)?,
            flags: view.u8(0x0C)?,
        };

        if header.first_entry_offset > header.used_size {
            return Err(IndexError::corrupt(format!(
                "first entry offset {} lies past the used size {}",
                header.first_entry_offset, header.used_size
            )));
        }
        if header.used_size > header.allocated_size {
            return Err(IndexError::corrupt(format!(
                "used size {} exceeds allocated size {}",
                header.used_size, header.allocated_size
            )));
        }
        if header.used_size as usize > view.remaining() {
            return Err(IndexError::corrupt(format!(
                "used size {} exceeds the {} bytes available to the node",
                header.used_size,
                view.remaining()
            )));
        }

        Ok(header)
    }

    pub fn first_entry_offset(&self) -> u32 {
        self.first_entry_offset
    }

    /// Bytes in use, measured from the header start
    pub fn used_size(&self) -> u32 {
        self.used_size
    }

    pub fn allocated_size(&self) -> u32 {
        self.allocated_size
    }

    /// True if entries of this node may point to subnodes
    pub fn has_children(&self) -> bool {
        self.flags & HAS_CHILDREN_FLAG != 0
    }

    /// Entry iterator for a node whose header begins at `header_base` in `node`.
    pub(crate) fn entries(&self, node: Arc<[u8]>, header_base: usize) -> IndexEntries {
        IndexEntries {
            node,
            pos: header_base + self.first_entry_offset as usize,
            end: header_base + self.used_size as usize,
        }
    }
}

/// Forward-only iterator over the entries of one node.
///
/// Iteration is bounded by the header's used size, not by the sentinel entry.
/// After the first error the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct IndexEntries {
    node: Arc<[u8]>,
    pos: usize,
    end: usize,
}

impl Iterator for IndexEntries {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }

        match IndexEntry::parse(self.node.clone(), self.pos, self.end) {
            Ok(entry) => {
                self.pos += entry.size() as usize;
                Some(Ok(entry))
            }
            Err(e) => {
                self.pos = self.end;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for IndexEntries {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{encode_node, EntrySpec};

    fn header_bytes(first: u32, used: u32, allocated: u32, flags: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; INDEX_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&first.to_le_bytes());
        bytes[4..8].copy_from_slice(&used.to_le_bytes());
        bytes[8..12].copy_from_slice(&allocated.to_le_bytes());
        bytes[12] = flags;
        bytes
    }

    #[test]
    fn test_parse_header() {
        let mut bytes = header_bytes(0x10, 0x40, 0x80, 1);
        bytes.resize(0x80, 0);
        let header = IndexHeader::parse(ByteView::new(&bytes, 0)).unwrap();

        assert_eq!(header.first_entry_offset(), 0x10);
        assert_eq!(header.used_size(), 0x40);
        assert_eq!(header.allocated_size(), 0x80);
        assert!(header.has_children());
    }

    #[test]
    fn test_inconsistent_sizes_are_corrupt() {
        let mut bytes = header_bytes(0x50, 0x40, 0x80, 0);
        bytes.resize(0x80, 0);
        assert!(IndexHeader::parse(ByteView::new(&bytes, 0)).is_err());

        let mut bytes = header_bytes(0x10, 0x90, 0x80, 0);
        bytes.resize(0x80, 0);
        assert!(IndexHeader::parse(ByteView::new(&bytes, 0)).is_err());

        // Used size claims more bytes than the buffer holds.
        let bytes = header_bytes(0x10, 0x40, 0x80, 0);
        assert!(IndexHeader::parse(ByteView::new(&bytes, 0)).is_err());
    }

    #[test]
    fn test_entries_stop_at_used_size() {
        let entries = vec![
            EntrySpec::key(1, b"a"),
            EntrySpec::key(2, b"b"),
            EntrySpec::sentinel(),
        ];
        let (mut node, used) = encode_node(&entries);
        // Garbage after the used region must never be parsed.
        node.extend_from_slice(&[0xFFu8; 64]);
        let node: Arc<[u8]> = Arc::from(node);

        let header = IndexHeader::parse(ByteView::new(&node, 0)).unwrap();
        assert_eq!(header.used_size(), used);

        let parsed: Vec<_> = header
            .entries(node.clone(), 0)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].file_reference_number(), 1);
        assert_eq!(parsed[1].file_reference_number(), 2);
        assert!(parsed[2].is_last_index_entry_in_subnode());
    }

    #[test]
    fn test_overrunning_entry_fuses_iterator() {
        let (mut node, _) = encode_node(&[EntrySpec::key(1, b"a"), EntrySpec::sentinel()]);
        // Inflate the first entry's size past the used region.
        let first = INDEX_HEADER_SIZE;
        node[first + 8..first + 10].copy_from_slice(&0x400u16.to_le_bytes());
        let node: Arc<[u8]> = Arc::from(node);

        let header = IndexHeader::parse(ByteView::new(&node, 0)).unwrap();
        let mut entries = header.entries(node.clone(), 0);
        assert!(entries.next().unwrap().is_err());
        assert!(entries.next().is_none());
    }
}
