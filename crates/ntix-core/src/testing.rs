//! Builders for synthetic index structures used across the unit tests.

use crate::entry::{IndexEntry, IndexEntryFlags, ENTRY_HEADER_SIZE};
use crate::header::INDEX_HEADER_SIZE;
use crate::index::NtfsIndex;
use crate::record::ClusterStream;
use crate::source::{DumpRecord, MemoryStream};
use std::io;
use std::sync::Arc;

pub const BLOCK_SIZE: usize = 4096;
pub const CLUSTER_SIZE: u32 = 4096;

/// Offset of the first entry inside a synthetic block, measured from the header
const BLOCK_FIRST_ENTRY: u32 = 0x28;

/// One entry to encode.
#[derive(Debug, Clone)]
pub struct EntrySpec {
    file_reference: u64,
    content: Vec<u8>,
    child: Option<i64>,
    last: bool,
}

impl EntrySpec {
    pub fn key(file_reference: u64, content: &[u8]) -> Self {
        EntrySpec {
            file_reference,
            content: content.to_vec(),
            child: None,
            last: false,
        }
    }

    pub fn sentinel() -> Self {
        EntrySpec {
            file_reference: 0,
            content: Vec::new(),
            child: None,
            last: true,
        }
    }

    pub fn with_child(mut self, vcn: i64) -> Self {
        self.child = Some(vcn);
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let key_size = (ENTRY_HEADER_SIZE + self.content.len()).next_multiple_of(8);
        let size = key_size + if self.child.is_some() { 8 } else { 0 };

        let mut flags = IndexEntryFlags::NONE;
        if self.child.is_some() {
            flags = flags | IndexEntryFlags::HAS_SUBNODE;
        }
        if self.last {
            flags = flags | IndexEntryFlags::LAST_ENTRY;
        }

        let mut bytes = vec![0u8; size];
        bytes[0..8].copy_from_slice(&self.file_reference.to_le_bytes());
        bytes[8..10].copy_from_slice(&(size as u16).to_le_bytes());
        bytes[10..12].copy_from_slice(&(self.content.len() as u16).to_le_bytes());
        bytes[12] = flags.bits();
        bytes[ENTRY_HEADER_SIZE..ENTRY_HEADER_SIZE + self.content.len()]
            .copy_from_slice(&self.content);
        if let Some(vcn) = self.child {
            bytes[size - 8..].copy_from_slice(&vcn.to_le_bytes());
        }
        bytes
    }
}

fn encode_entries(entries: &[EntrySpec]) -> (Vec<u8>, bool) {
    let mut bytes = Vec::new();
    for entry in entries {
        bytes.extend(entry.encode());
    }
    (bytes, entries.iter().any(|e| e.child.is_some()))
}

fn write_header(dest: &mut [u8], first: u32, used: u32, allocated: u32, children: bool) {
    dest[0..4].copy_from_slice(&first.to_le_bytes());
    dest[4..8].copy_from_slice(&used.to_le_bytes());
    dest[8..12].copy_from_slice(&allocated.to_le_bytes());
    dest[12] = u8::from(children);
}

/// A header followed directly by `entries`. Returns the bytes and used size.
pub fn encode_node(entries: &[EntrySpec]) -> (Vec<u8>, u32) {
    let (body, children) = encode_entries(entries);
    let used = (INDEX_HEADER_SIZE + body.len()) as u32;

    let mut bytes = vec![0u8; INDEX_HEADER_SIZE];
    write_header(&mut bytes, INDEX_HEADER_SIZE as u32, used, used, children);
    bytes.extend(body);
    (bytes, used)
}

/// The value of a `$INDEX_ROOT` attribute for a `$FILE_NAME` index.
pub fn encode_root(block_size: u32, clusters_per_block: u8, entries: &[EntrySpec]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend(0x30u32.to_le_bytes());
    bytes.extend(0x01u32.to_le_bytes());
    bytes.extend(block_size.to_le_bytes());
    bytes.push(clusters_per_block);
    bytes.extend([0u8; 3]);
    bytes.extend(encode_node(entries).0);
    bytes
}

/// A complete INDX block of `block_size` bytes.
pub fn encode_block(vcn: i64, entries: &[EntrySpec], block_size: usize) -> Vec<u8> {
    let (body, children) = encode_entries(entries);
    let header_start = 0x18;
    let first = header_start + BLOCK_FIRST_ENTRY as usize;
    assert!(first + body.len() <= block_size, "entries overflow block");

    let mut bytes = vec![0u8; block_size];
    bytes[0..4].copy_from_slice(b"INDX");
    bytes[4..6].copy_from_slice(&0x28u16.to_le_bytes());
    bytes[8..16].copy_from_slice(&(0x1000 + vcn as u64).to_le_bytes());
    bytes[16..24].copy_from_slice(&vcn.to_le_bytes());
    write_header(
        &mut bytes[header_start..],
        BLOCK_FIRST_ENTRY,
        BLOCK_FIRST_ENTRY + body.len() as u32,
        (block_size - header_start) as u32,
        children,
    );
    bytes[first..first + body.len()].copy_from_slice(&body);
    bytes
}

/// The u32 key stored big-endian in a synthetic entry's content
pub fn key_of(entry: &IndexEntry) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&entry.content()[..4]);
    u32::from_be_bytes(raw)
}

/// Entries of one node, keyed by u32 values.
///
/// Every key entry uses the key as its file reference number.
#[derive(Debug, Clone, Default)]
pub struct NodeSpec(Vec<EntrySpec>);

impl NodeSpec {
    pub fn new() -> Self {
        NodeSpec(Vec::new())
    }

    pub fn key(mut self, key: u32) -> Self {
        self.0.push(EntrySpec::key(key as u64, &key.to_be_bytes()));
        self
    }

    pub fn key_with_child(mut self, key: u32, vcn: i64) -> Self {
        self.0
            .push(EntrySpec::key(key as u64, &key.to_be_bytes()).with_child(vcn));
        self
    }

    pub fn sentinel(mut self) -> Self {
        self.0.push(EntrySpec::sentinel());
        self
    }

    pub fn sentinel_with_child(mut self, vcn: i64) -> Self {
        self.0.push(EntrySpec::sentinel().with_child(vcn));
        self
    }

    pub fn entries(&self) -> &[EntrySpec] {
        &self.0
    }
}

/// A whole index: a root node plus blocks placed at their VCNs.
///
/// Blocks are 4 KiB with one cluster per block, so block `v` starts at byte
/// `v * 4096` of the allocation stream. Gaps read back as zeroes.
pub struct IndexTree {
    root: NodeSpec,
    blocks: Vec<(i64, NodeSpec)>,
}

impl IndexTree {
    pub fn new(root: NodeSpec, blocks: Vec<(i64, NodeSpec)>) -> Self {
        IndexTree { root, blocks }
    }

    fn root_bytes(&self) -> Vec<u8> {
        encode_root(BLOCK_SIZE as u32, 1, self.root.entries())
    }

    /// The allocation stream with every block at its VCN
    pub fn allocation_stream(&self) -> Vec<u8> {
        let slots = self.blocks.iter().map(|(vcn, _)| *vcn + 1).max().unwrap_or(0);
        let mut stream = vec![0u8; slots as usize * BLOCK_SIZE];
        for (vcn, node) in &self.blocks {
            let start = *vcn as usize * BLOCK_SIZE;
            stream[start..start + BLOCK_SIZE]
                .copy_from_slice(&encode_block(*vcn, node.entries(), BLOCK_SIZE));
        }
        stream
    }

    pub fn record(&self) -> DumpRecord {
        DumpRecord::new("$I30", self.root_bytes(), CLUSTER_SIZE).with_extent(Arc::new(
            MemoryStream::new(self.allocation_stream(), CLUSTER_SIZE),
        ))
    }

    pub fn index(&self) -> NtfsIndex<DumpRecord> {
        NtfsIndex::new(self.record(), "$I30")
    }

    pub fn index_without_allocation(&self) -> NtfsIndex<DumpRecord> {
        NtfsIndex::new(
            DumpRecord::new("$I30", self.root_bytes(), CLUSTER_SIZE),
            "$I30",
        )
    }
}

/// A stream that claims `vcn_count` clusters but always delivers one fewer
/// than requested.
pub struct ShortStream {
    inner: MemoryStream,
    vcn_count: u64,
}

impl ShortStream {
    pub fn new(data: Vec<u8>, cluster_size: u32, vcn_count: u64) -> Self {
        ShortStream {
            inner: MemoryStream::new(data, cluster_size),
            vcn_count,
        }
    }
}

impl ClusterStream for ShortStream {
    fn read_vcn(&self, vcn: u64, dest: &mut [u8], cluster_count: usize) -> io::Result<usize> {
        self.inner
            .read_vcn(vcn, dest, cluster_count.saturating_sub(1))
    }

    fn vcn_count(&self) -> u64 {
        self.vcn_count
    }
}
