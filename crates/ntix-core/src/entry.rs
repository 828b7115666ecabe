//! Index entries: the slots inside an index node.
//!
//! ## Entry Layout
//!
//! ```text
//! +0x00  u64  file reference (48-bit record number + 16-bit sequence)
//! +0x08  u16  entry size
//! +0x0A  u16  content size
//! +0x0C  u8   flags (0x01 = has subnode, 0x02 = last entry in node)
//! +0x10  ...  content (the key, e.g. a $FILE_NAME attribute)
//! size-8 i64  subnode VCN, present only when the has-subnode flag is set
//! ```

use crate::error::{IndexError, Result};
use crate::types::{FileReference, Vcn};
use crate::view::ByteView;
use std::fmt;
use std::sync::Arc;

/// Size of the fixed entry header preceding the content
pub const ENTRY_HEADER_SIZE: usize = 0x10;

/// Size of the trailing subnode VCN
const SUBNODE_VCN_SIZE: usize = 8;

/// Flags stored at +0x0C of an index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntryFlags(u8);

impl IndexEntryFlags {
    /// A normal key entry without a child node
    pub const NONE: Self = IndexEntryFlags(0);
    /// The entry points to a subnode
    pub const HAS_SUBNODE: Self = IndexEntryFlags(0x01);
    /// Keyless sentinel closing the node
    pub const LAST_ENTRY: Self = IndexEntryFlags(0x02);

    pub fn from_bits(bits: u8) -> Self {
        IndexEntryFlags(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: IndexEntryFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for IndexEntryFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        IndexEntryFlags(self.0 | rhs.0)
    }
}

/// One entry of an index node.
///
/// The entry keeps a shared handle on the node buffer it was parsed from, so
/// it stays valid after the node itself has been dropped. All fixed fields are
/// validated when the entry is parsed; the accessors never fail.
#[derive(Clone)]
pub struct IndexEntry {
    node: Arc<[u8]>,
    offset: usize,
    file_reference: FileReference,
    size: u16,
    content_size: u16,
    flags: IndexEntryFlags,
    subnode_vcn: Option<Vcn>,
}

impl IndexEntry {
    /// Parse the entry at `offset`, which must end at or before `end`.
    pub(crate) fn parse(node: Arc<[u8]>, offset: usize, end: usize) -> Result<Self> {
        let limit = end.min(node.len());
        let view = ByteView::new(&node[..limit], offset);

        let file_reference = FileReference::from_parts(view.u48(0x00)?, view.u16(0x06)?);
        let size = view.u16(0x08)?;
        let content_size = view.u16(0x0A)?;
        let flags = IndexEntryFlags::from_bits(view.u8(0x0C)?);

        let size_usize = size as usize;
        if size_usize < ENTRY_HEADER_SIZE {
            return Err(IndexError::corrupt(format!(
                "index entry at offset {} has size {} below the {}-byte header",
                offset, size, ENTRY_HEADER_SIZE
            )));
        }
        if size_usize > view.remaining() {
            return Err(IndexError::corrupt(format!(
                "index entry at offset {} has size {} but only {} bytes remain in the node",
                offset,
                size,
                view.remaining()
            )));
        }

        let has_subnode = flags.contains(IndexEntryFlags::HAS_SUBNODE);
        let key_limit = if has_subnode {
            if size_usize < ENTRY_HEADER_SIZE + SUBNODE_VCN_SIZE {
                return Err(IndexError::corrupt(format!(
                    "index entry at offset {} has a subnode but size {} leaves no room for its VCN",
                    offset, size
                )));
            }
            size_usize - SUBNODE_VCN_SIZE
        } else {
            size_usize
        };

        if ENTRY_HEADER_SIZE + content_size as usize > key_limit {
            return Err(IndexError::corrupt(format!(
                "index entry at offset {} declares {} content bytes in a {}-byte entry",
                offset, content_size, size
            )));
        }

        let subnode_vcn = if has_subnode {
            Some(Vcn(view.i64(size_usize - SUBNODE_VCN_SIZE)?))
        } else {
            None
        };

        Ok(IndexEntry {
            node,
            offset,
            file_reference,
            size,
            content_size,
            flags,
            subnode_vcn,
        })
    }

    /// Total size of this entry in bytes
    pub fn size(&self) -> u16 {
        self.size
    }

    /// Length of the key content in bytes (0 for most sentinels)
    pub fn content_size(&self) -> u16 {
        self.content_size
    }

    pub fn index_flags(&self) -> IndexEntryFlags {
        self.flags
    }

    /// The 48-bit MFT record number this entry refers to
    pub fn file_reference_number(&self) -> u64 {
        self.file_reference.record_number()
    }

    /// The full file reference including its sequence number
    pub fn file_reference(&self) -> FileReference {
        self.file_reference
    }

    pub fn has_sub_nodes(&self) -> bool {
        self.flags.contains(IndexEntryFlags::HAS_SUBNODE)
    }

    /// True for the keyless entry that closes every node
    pub fn is_last_index_entry_in_subnode(&self) -> bool {
        self.flags.contains(IndexEntryFlags::LAST_ENTRY)
    }

    /// VCN of the child node, `None` exactly when [`has_sub_nodes`] is false.
    ///
    /// [`has_sub_nodes`]: IndexEntry::has_sub_nodes
    pub fn subnode_vcn(&self) -> Option<Vcn> {
        self.subnode_vcn
    }

    /// The key bytes, interpreted by the caller's comparator.
    pub fn content(&self) -> &[u8] {
        let start = self.offset + ENTRY_HEADER_SIZE;
        &self.node[start..start + self.content_size as usize]
    }

    /// Offset of this entry within its node buffer
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Debug for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexEntry")
            .field("offset", &self.offset)
            .field("file_reference", &self.file_reference)
            .field("size", &self.size)
            .field("content_size", &self.content_size)
            .field("flags", &self.flags)
            .field("subnode_vcn", &self.subnode_vcn)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::EntrySpec;

    fn parse(bytes: Vec<u8>) -> Result<IndexEntry> {
        let len = bytes.len();
        IndexEntry::parse(Arc::from(bytes), 0, len)
    }

    #[test]
    fn test_key_entry_fields() {
        let entry = parse(EntrySpec::key(0x0001_0000_0000_0040, b"abcd").encode()).unwrap();

        assert_eq!(entry.file_reference_number(), 0x40);
        assert_eq!(entry.file_reference().sequence_number(), 1);
        assert_eq!(entry.size(), 0x18);
        assert_eq!(entry.content_size(), 4);
        assert_eq!(entry.content(), b"abcd");
        assert!(!entry.has_sub_nodes());
        assert!(!entry.is_last_index_entry_in_subnode());
        assert_eq!(entry.subnode_vcn(), None);
    }

    #[test]
    fn test_sentinel_with_subnode() {
        let entry = parse(EntrySpec::sentinel().with_child(7).encode()).unwrap();

        assert!(entry.is_last_index_entry_in_subnode());
        assert!(entry.has_sub_nodes());
        assert_eq!(entry.content_size(), 0);
        assert!(entry.content().is_empty());
        assert_eq!(entry.subnode_vcn(), Some(Vcn(7)));
    }

    #[test]
    fn test_subnode_vcn_absent_without_flag() {
        // Trailing bytes that look like a VCN are ignored without the flag.
        let mut bytes = EntrySpec::key(1, b"x").encode();
        let len = bytes.len();
        bytes[len - 8..].copy_from_slice(&9i64.to_le_bytes());

        let entry = parse(bytes).unwrap();
        assert!(!entry.has_sub_nodes());
        assert_eq!(entry.subnode_vcn(), None);
    }

    #[test]
    fn test_undersized_entry_is_corrupt() {
        let mut bytes = EntrySpec::key(1, b"x").encode();
        bytes[8..10].copy_from_slice(&8u16.to_le_bytes());
        assert!(matches!(parse(bytes), Err(IndexError::Corrupt { .. })));
    }

    #[test]
    fn test_entry_past_node_end_is_corrupt() {
        let bytes = EntrySpec::key(1, b"abcdefgh").encode();
        let node: Arc<[u8]> = Arc::from(bytes);
        let err = IndexEntry::parse(node.clone(), 0, node.len() - 8).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_content_larger_than_entry_is_corrupt() {
        let mut bytes = EntrySpec::key(1, b"x").encode();
        bytes[0x0A..0x0C].copy_from_slice(&200u16.to_le_bytes());
        assert!(parse(bytes).unwrap_err().is_corruption());
    }

    #[test]
    fn test_subnode_without_room_is_corrupt() {
        let mut bytes = vec![0u8; 0x10];
        bytes[8..10].copy_from_slice(&0x10u16.to_le_bytes());
        bytes[0x0C] = 0x03;
        assert!(parse(bytes).unwrap_err().is_corruption());
    }
}
