//! The resident `$INDEX_ROOT` attribute.
//!
//! ## Root Layout
//!
//! ```text
//! +0x00  u32  type of the indexed attribute (0x30 for directories)
//! +0x04  u32  collation rule
//! +0x08  u32  index block size in bytes
//! +0x0C  u8   clusters per index block
//! +0x10  index header, followed by the entries
//! ```

use crate::error::{IndexError, Result};
use crate::header::{IndexEntries, IndexHeader};
use crate::types::{AttributeType, CollationRule};
use crate::view::ByteView;
use std::sync::Arc;

/// Offset of the index header within the root attribute value
pub const INDEX_ROOT_HEADER_OFFSET: usize = 0x10;

/// The top node of an index, stored inside the file record.
///
/// Besides its own entries it carries the sizing metadata needed to locate
/// blocks in the allocation stream.
#[derive(Debug, Clone)]
pub struct IndexRoot {
    data: Arc<[u8]>,
    indexed_attribute_type: AttributeType,
    collation_rule: CollationRule,
    index_block_size: u32,
    clusters_per_index_block: u8,
    header: IndexHeader,
}

impl IndexRoot {
    /// Parse the value bytes of a resident `$INDEX_ROOT` attribute.
    pub fn parse(data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let data = data.into();
        let view = ByteView::new(&data, 0);

        let indexed_attribute_type = AttributeType::from_code(view.u32(0x00)?);
        let collation_rule = CollationRule::from_code(view.u32(0x04)?);
        let index_block_size = view.u32(0x08)?;
        let clusters_per_index_block = view.u8(0x0C)?;
        let header = IndexHeader::parse(view.at(INDEX_ROOT_HEADER_OFFSET))?;

        Ok(IndexRoot {
            data,
            indexed_attribute_type,
            collation_rule,
            index_block_size,
            clusters_per_index_block,
            header,
        })
    }

    /// Attribute type whose values form the keys (e.g. `$FILE_NAME`)
    pub fn indexed_attribute_type(&self) -> AttributeType {
        self.indexed_attribute_type
    }

    pub fn collation_rule(&self) -> CollationRule {
        self.collation_rule
    }

    /// Size of every index block in the allocation stream, in bytes
    pub fn index_block_size(&self) -> u32 {
        self.index_block_size
    }

    pub fn clusters_per_index_block(&self) -> u8 {
        self.clusters_per_index_block
    }

    /// Size of the unit subnode VCNs are counted in.
    pub fn index_cluster_size(&self) -> Result<u32> {
        if self.clusters_per_index_block == 0 || self.index_block_size == 0 {
            return Err(IndexError::corrupt(format!(
                "index root declares {} clusters per {}-byte index block",
                self.clusters_per_index_block, self.index_block_size
            )));
        }
        Ok(self.index_block_size / self.clusters_per_index_block as u32)
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    /// Iterate the entries held directly in the root.
    pub fn entries(&self) -> IndexEntries {
        self.header
            .entries(self.data.clone(), INDEX_ROOT_HEADER_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{encode_root, EntrySpec};

    #[test]
    fn test_parse_root() {
        let entries = vec![
            EntrySpec::key(30, b"alpha"),
            EntrySpec::sentinel().with_child(0),
        ];
        let root = IndexRoot::parse(encode_root(4096, 1, &entries)).unwrap();

        assert_eq!(root.indexed_attribute_type(), AttributeType::FileName);
        assert_eq!(root.collation_rule(), CollationRule::FileName);
        assert_eq!(root.index_block_size(), 4096);
        assert_eq!(root.clusters_per_index_block(), 1);
        assert_eq!(root.index_cluster_size().unwrap(), 4096);
        assert!(root.header().has_children());

        let parsed: Vec<_> = root.entries().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].content(), b"alpha");
    }

    #[test]
    fn test_index_cluster_size_small_blocks() {
        let root = IndexRoot::parse(encode_root(4096, 8, &[EntrySpec::sentinel()])).unwrap();
        assert_eq!(root.index_cluster_size().unwrap(), 512);
    }

    #[test]
    fn test_zero_clusters_per_block_is_corrupt() {
        let root = IndexRoot::parse(encode_root(4096, 0, &[EntrySpec::sentinel()])).unwrap();
        assert!(root.index_cluster_size().unwrap_err().is_corruption());
    }

    #[test]
    fn test_truncated_root() {
        assert!(IndexRoot::parse(vec![0u8; 0x0C]).is_err());
    }

    #[test]
    fn test_empty_root_has_no_entries() {
        let root = IndexRoot::parse(encode_root(4096, 1, &[])).unwrap();
        assert_eq!(root.entries().count(), 0);
    }
}
