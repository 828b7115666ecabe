//! The non-resident `$INDEX_ALLOCATION` attribute.
//!
//! Subnode pointers count in *index clusters*, whose size is
//! `index_block_size / clusters_per_index_block`. The allocation stream is
//! read in *filesystem clusters*. When index clusters are smaller than
//! filesystem clusters, several index blocks share one filesystem cluster
//! and a block starts part-way into the first cluster read.

use crate::block::IndexBlock;
use crate::error::{IndexError, Result};
use crate::record::{Attribute, ClusterStream};
use crate::root::IndexRoot;
use crate::types::{AttributeType, Vcn};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Where an index block lives in filesystem-cluster terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLocation {
    /// First filesystem cluster to read
    pub fs_vcn: u64,

    /// Number of filesystem clusters to read
    pub fs_clusters: usize,

    /// Byte offset of the block within the first cluster read
    pub offset_into_vcn: usize,
}

impl BlockLocation {
    /// Translate an index VCN into a filesystem cluster range.
    pub fn compute(
        vcn: Vcn,
        index_block_size: u32,
        index_cluster_size: u32,
        fs_cluster_size: u32,
    ) -> Result<Self> {
        if fs_cluster_size == 0 {
            return Err(IndexError::corrupt("filesystem cluster size is zero"));
        }
        let index_vcn = u64::try_from(vcn.value())
            .map_err(|_| IndexError::corrupt(format!("negative subnode VCN {}", vcn)))?;
        let byte_offset = index_vcn
            .checked_mul(index_cluster_size as u64)
            .ok_or_else(|| IndexError::corrupt(format!("subnode VCN {} overflows", vcn)))?;

        let fs_cluster_size = fs_cluster_size as u64;
        let fs_clusters = (index_block_size as u64).div_ceil(fs_cluster_size);

        Ok(BlockLocation {
            fs_vcn: byte_offset / fs_cluster_size,
            fs_clusters: fs_clusters as usize,
            offset_into_vcn: (byte_offset % fs_cluster_size) as usize,
        })
    }
}

/// Reader for the index blocks of one index.
///
/// Holds the attribute's extents in VCN order. It caches nothing: every
/// call to [`index_block`] reads from the underlying streams.
///
/// [`index_block`]: IndexAllocation::index_block
#[derive(Clone)]
pub struct IndexAllocation {
    extents: Vec<Arc<dyn ClusterStream>>,
    cluster_size: u32,
}

impl IndexAllocation {
    /// Create an allocation reader over `extents`, given in VCN order.
    pub fn new(extents: Vec<Arc<dyn ClusterStream>>, cluster_size: u32) -> Self {
        IndexAllocation {
            extents,
            cluster_size,
        }
    }

    /// Build from the attributes a file record returned.
    ///
    /// Returns `None` when there are no attributes, i.e. the index is fully
    /// resident.
    pub fn from_attributes(attributes: Vec<Attribute>, cluster_size: u32) -> Result<Option<Self>> {
        if attributes.is_empty() {
            return Ok(None);
        }

        let extents = attributes
            .into_iter()
            .map(|attribute| match attribute {
                Attribute::NonResident(stream) => Ok(stream),
                Attribute::Resident(_) => Err(IndexError::UnexpectedResident {
                    ty: AttributeType::IndexAllocation,
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(IndexAllocation::new(extents, cluster_size)))
    }

    /// Filesystem cluster size in bytes
    pub fn cluster_size(&self) -> u32 {
        self.cluster_size
    }

    /// Total number of filesystem clusters across all extents
    pub fn total_clusters(&self) -> u64 {
        self.extents.iter().map(|e| e.vcn_count()).sum()
    }

    /// Read and parse the index block at index VCN `vcn`.
    pub fn index_block(&self, root: &IndexRoot, vcn: Vcn) -> Result<IndexBlock> {
        let location = BlockLocation::compute(
            vcn,
            root.index_block_size(),
            root.index_cluster_size()?,
            self.cluster_size,
        )?;
        trace!(
            %vcn,
            fs_vcn = location.fs_vcn,
            fs_clusters = location.fs_clusters,
            offset = location.offset_into_vcn,
            "Translated index VCN"
        );

        let total = self.total_clusters();
        let fs_clusters = location.fs_clusters as u64;
        if location.fs_vcn.saturating_add(fs_clusters) > total {
            return Err(IndexError::vcn_out_of_range(
                vcn,
                location.fs_vcn,
                fs_clusters,
                total,
            ));
        }

        let cluster_size = self.cluster_size as usize;
        let mut buffer = vec![0u8; location.fs_clusters * cluster_size];
        let read = self.read_clusters(location.fs_vcn, &mut buffer, location.fs_clusters)?;
        if read != location.fs_clusters {
            return Err(IndexError::ShortRead {
                vcn: location.fs_vcn,
                requested: location.fs_clusters,
                read,
            });
        }
        debug!(%vcn, clusters = read, "Read index block");

        let block = IndexBlock::parse(
            Arc::from(buffer),
            location.offset_into_vcn,
            root.index_block_size() as usize,
        )?;

        if block.index_block_vcn() != vcn {
            return Err(IndexError::corrupt(format!(
                "index block read for VCN {} records VCN {}",
                vcn,
                block.index_block_vcn()
            )));
        }

        Ok(block)
    }

    /// Read `count` clusters starting at filesystem VCN `fs_vcn`, walking the
    /// extents in order. Each extent counts its VCNs from zero.
    fn read_clusters(&self, fs_vcn: u64, buffer: &mut [u8], count: usize) -> Result<usize> {
        let cluster_size = self.cluster_size as usize;
        let mut vcn = fs_vcn;
        let mut read = 0usize;

        for extent in &self.extents {
            if read == count {
                break;
            }

            let extent_len = extent.vcn_count();
            if vcn >= extent_len {
                vcn -= extent_len;
                continue;
            }

            let available = usize::try_from(extent_len - vcn).unwrap_or(usize::MAX);
            let want = available.min(count - read);
            let dest = &mut buffer[read * cluster_size..(read + want) * cluster_size];
            let got = extent.read_vcn(vcn, dest, want)?.min(want);

            read += got;
            if got < want {
                break;
            }
            vcn = 0;
        }

        Ok(read)
    }
}

impl fmt::Debug for IndexAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexAllocation")
            .field("extents", &self.extents.len())
            .field("total_clusters", &self.total_clusters())
            .field("cluster_size", &self.cluster_size)
            .finish()
    }
}
