//! Keyed search and full enumeration over an NTFS index.
//!
//! An index is a B+tree: the root node lives in the resident `$INDEX_ROOT`
//! attribute, every other node is an [`IndexBlock`] in `$INDEX_ALLOCATION`.
//! Each node ends with a keyless sentinel entry; an entry with the
//! has-subnode flag points to the child holding the keys that sort before it
//! (the sentinel's child holds the keys greater than everything in the node).
//!
//! ## Traversal
//!
//! Both operations walk the tree iteratively, so corrupt or adversarial
//! volumes cannot exhaust the call stack:
//!
//! - [`NtfsIndex::search`] descends one node per level, steered by an
//!   [`IndexSearchCallback`]
//! - [`NtfsIndex::iter`] visits nodes breadth-first through a FIFO of
//!   pending subnode VCNs. The order is *not* key order.
//!
//! A block VCN reached twice within one traversal is reported as corruption.

use crate::allocation::IndexAllocation;
use crate::block::IndexBlock;
use crate::entry::IndexEntry;
use crate::error::{IndexError, Result};
use crate::header::IndexEntries;
use crate::record::{Attribute, FileRecord};
use crate::root::IndexRoot;
use crate::types::{AttributeType, Vcn};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Compares the sought key against index entries during [`NtfsIndex::search`].
///
/// The result orders the *sought key* relative to `entry`:
///
/// - `Equal`: `entry` is the match
/// - `Less`: the key sorts before `entry`, continue in `entry`'s subnode
/// - `Greater`: the key sorts after `entry`, continue with the next entry
///
/// Sentinel entries are never passed to the callback.
pub trait IndexSearchCallback {
    fn visit_and_compare_entry(&mut self, entry: &IndexEntry) -> Ordering;
}

impl<F> IndexSearchCallback for F
where
    F: FnMut(&IndexEntry) -> Ordering,
{
    fn visit_and_compare_entry(&mut self, entry: &IndexEntry) -> Ordering {
        self(entry)
    }
}

/// An index of one file record, identified by its attribute name
/// (`$I30` for directories, `$SDH`/`$SII` for `$Secure`, ...).
///
/// The root and allocation attributes are resolved on first use and cached
/// for the lifetime of the index. Resolution is serialized by a lock, so a
/// shared `NtfsIndex` may be used from several threads as long as the file
/// record itself supports concurrent reads.
pub struct NtfsIndex<R> {
    record: R,
    name: String,
    root: Mutex<Option<Arc<IndexRoot>>>,
    allocation: Mutex<Option<Option<Arc<IndexAllocation>>>>,
}

impl<R: FileRecord> NtfsIndex<R> {
    /// Bind an index to the attributes named `name` in `record`.
    pub fn new(record: R, name: impl Into<String>) -> Self {
        NtfsIndex {
            record,
            name: name.into(),
            root: Mutex::new(None),
            allocation: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    /// The index root, resolved once and cached.
    pub fn root(&self) -> Result<Arc<IndexRoot>> {
        let mut slot = self.root.lock();
        if let Some(root) = slot.as_ref() {
            return Ok(root.clone());
        }

        let root = Arc::new(self.resolve_root()?);
        debug!(
            index = %self.name,
            block_size = root.index_block_size(),
            clusters_per_block = root.clusters_per_index_block(),
            collation = %root.collation_rule(),
            "Resolved index root"
        );
        *slot = Some(root.clone());
        Ok(root)
    }

    fn resolve_root(&self) -> Result<IndexRoot> {
        let attributes = self
            .record
            .find_attributes(AttributeType::IndexRoot, &self.name)?;

        match attributes.into_iter().next() {
            Some(Attribute::Resident(data)) => IndexRoot::parse(data),
            Some(Attribute::NonResident(_)) => Err(IndexError::UnexpectedNonResident {
                ty: AttributeType::IndexRoot,
            }),
            None => Err(IndexError::AttributeNotFound {
                ty: AttributeType::IndexRoot,
                name: self.name.clone(),
            }),
        }
    }

    /// The allocation attribute, or `None` for a fully resident index.
    ///
    /// The outcome, including absence, is cached after the first call.
    pub fn allocation(&self) -> Result<Option<Arc<IndexAllocation>>> {
        let mut slot = self.allocation.lock();
        if let Some(allocation) = slot.as_ref() {
            return Ok(allocation.clone());
        }

        let attributes = self
            .record
            .find_attributes(AttributeType::IndexAllocation, &self.name)?;
        let allocation =
            IndexAllocation::from_attributes(attributes, self.record.cluster_size())?.map(Arc::new);

        match &allocation {
            Some(a) => debug!(index = %self.name, clusters = a.total_clusters(), "Resolved index allocation"),
            None => debug!(index = %self.name, "Index has no allocation attribute"),
        }
        *slot = Some(allocation.clone());
        Ok(allocation)
    }

    /// Materialize the block a subnode pointer refers to.
    fn subnode_block(
        &self,
        root: &IndexRoot,
        vcn: Vcn,
        visited: &mut HashSet<Vcn>,
    ) -> Result<IndexBlock> {
        if !visited.insert(vcn) {
            return Err(IndexError::corrupt(format!(
                "index block at VCN {} is referenced twice",
                vcn
            )));
        }

        let allocation = self.allocation()?.ok_or_else(|| {
            IndexError::corrupt(format!(
                "entry points to subnode VCN {} but index {} has no allocation",
                vcn, self.name
            ))
        })?;

        allocation.index_block(root, vcn)
    }

    /// Look up a key, steered by `callback`.
    ///
    /// Returns the entry the callback reports as equal, or `None` when the
    /// key is not present. The search assumes entries within a node are in
    /// ascending key order with the sentinel last, as NTFS guarantees; it
    /// does not verify this.
    #[instrument(level = "debug", skip(self, callback), fields(index = %self.name))]
    pub fn search<C>(&self, callback: &mut C) -> Result<Option<IndexEntry>>
    where
        C: IndexSearchCallback + ?Sized,
    {
        let root = self.root()?;
        let mut entries = root.entries();
        let mut visited = HashSet::new();
        let mut depth = 0usize;

        loop {
            let mut descend = None;

            for entry in entries {
                let entry = entry?;

                if entry.is_last_index_entry_in_subnode() {
                    descend = entry.subnode_vcn();
                    break;
                }

                match callback.visit_and_compare_entry(&entry) {
                    Ordering::Equal => {
                        debug!(
                            depth,
                            file_reference = %entry.file_reference(),
                            "Index search matched"
                        );
                        return Ok(Some(entry));
                    }
                    Ordering::Less => {
                        descend = entry.subnode_vcn();
                        break;
                    }
                    Ordering::Greater => {}
                }
            }

            let Some(vcn) = descend else {
                debug!(depth, "Index search found no match");
                return Ok(None);
            };

            trace!(%vcn, depth, "Descending into subnode");
            entries = self.subnode_block(&root, vcn, &mut visited)?.entries();
            depth += 1;
        }
    }

    /// Enumerate every entry of the index, sentinels included.
    ///
    /// The sequence is lazy: allocation blocks are read as the iterator
    /// reaches them. Entries come breadth-first, root first, so the order
    /// does not follow the key order.
    pub fn iter(&self) -> Result<IndexIter<'_, R>> {
        IndexIter::new(self)
    }
}

impl<R> fmt::Debug for NtfsIndex<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NtfsIndex")
            .field("name", &self.name)
            .field("root_resolved", &self.root.lock().is_some())
            .field("allocation_resolved", &self.allocation.lock().is_some())
            .finish()
    }
}

/// Breadth-first iterator over all entries of an [`NtfsIndex`].
///
/// The iterator always holds the next entry read ahead, so [`has_next`]
/// answers without touching the disk. It is forward-only and stops after
/// the first error.
///
/// [`has_next`]: IndexIter::has_next
pub struct IndexIter<'a, R> {
    index: &'a NtfsIndex<R>,
    root: Arc<IndexRoot>,
    current: IndexEntries,
    pending: VecDeque<Vcn>,
    visited: HashSet<Vcn>,
    next_entry: Option<Result<IndexEntry>>,
}

impl<'a, R: FileRecord> IndexIter<'a, R> {
    fn new(index: &'a NtfsIndex<R>) -> Result<Self> {
        let root = index.root()?;
        let mut iter = IndexIter {
            index,
            current: root.entries(),
            root,
            pending: VecDeque::new(),
            visited: HashSet::new(),
            next_entry: None,
        };
        iter.next_entry = iter.fetch();
        Ok(iter)
    }

    /// True if another item (entry or error) is available
    pub fn has_next(&self) -> bool {
        self.next_entry.is_some()
    }

    /// Number of subnodes queued but not yet read
    pub fn pending_blocks(&self) -> usize {
        self.pending.len()
    }

    fn fetch(&mut self) -> Option<Result<IndexEntry>> {
        loop {
            match self.current.next() {
                Some(Ok(entry)) => {
                    if let Some(vcn) = entry.subnode_vcn() {
                        self.pending.push_back(vcn);
                    }
                    return Some(Ok(entry));
                }
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    let vcn = self.pending.pop_front()?;
                    trace!(%vcn, pending = self.pending.len(), "Reading queued subnode");
                    match self.index.subnode_block(&self.root, vcn, &mut self.visited) {
                        Ok(block) => self.current = block.entries(),
                        Err(e) => return Some(Err(e)),
                    }
                }
            }
        }
    }
}

impl<'a, R: FileRecord> Iterator for IndexIter<'a, R> {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.next_entry.take()?;
        if item.is_ok() {
            self.next_entry = self.fetch();
        }
        Some(item)
    }
}

impl<'a, R: FileRecord> FusedIterator for IndexIter<'a, R> {}

impl<'a, R> fmt::Debug for IndexIter<'a, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexIter")
            .field("index", &self.index.name)
            .field("pending", &self.pending)
            .field("has_next", &self.next_entry.is_some())
            .finish()
    }
}
