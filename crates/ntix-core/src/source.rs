//! Concrete collaborators for reading indexes outside a mounted volume.
//!
//! - [`MemoryStream`]: an attribute stream held in memory
//! - [`FileStream`]: an attribute stream extracted to a file
//! - [`DumpRecord`]: a file record assembled from a dumped `$INDEX_ROOT`
//!   value and its allocation extents

use crate::error::Result;
use crate::record::{Attribute, ClusterStream, FileRecord};
use crate::types::AttributeType;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Number of clusters needed to hold `len` bytes
fn clusters_for(len: u64, cluster_size: u32) -> u64 {
    if cluster_size == 0 {
        return 0;
    }
    len.div_ceil(cluster_size as u64)
}

/// Validate a read request and return the number of clusters to serve.
fn clamp_request(
    vcn: u64,
    dest: &[u8],
    cluster_count: usize,
    cluster_size: u32,
    vcn_count: u64,
) -> io::Result<usize> {
    let needed = cluster_count.saturating_mul(cluster_size as usize);
    if dest.len() < needed {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "destination holds {} bytes, {} clusters need {}",
                dest.len(),
                cluster_count,
                needed
            ),
        ));
    }
    let available = vcn_count.saturating_sub(vcn);
    Ok(usize::try_from(available).map_or(cluster_count, |a| a.min(cluster_count)))
}

/// An attribute stream held in memory.
///
/// A trailing partial cluster reads back zero-padded.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    data: Vec<u8>,
    cluster_size: u32,
}

impl MemoryStream {
    pub fn new(data: Vec<u8>, cluster_size: u32) -> Self {
        MemoryStream { data, cluster_size }
    }
}

impl ClusterStream for MemoryStream {
    fn read_vcn(&self, vcn: u64, dest: &mut [u8], cluster_count: usize) -> io::Result<usize> {
        let clusters = clamp_request(
            vcn,
            dest,
            cluster_count,
            self.cluster_size,
            self.vcn_count(),
        )?;
        if clusters == 0 {
            return Ok(0);
        }

        let cluster_size = self.cluster_size as usize;
        let start = vcn as usize * cluster_size;
        let len = clusters * cluster_size;
        let end = (start + len).min(self.data.len());

        dest[..end - start].copy_from_slice(&self.data[start..end]);
        dest[end - start..len].fill(0);
        Ok(clusters)
    }

    fn vcn_count(&self) -> u64 {
        clusters_for(self.data.len() as u64, self.cluster_size)
    }
}

/// An attribute stream extracted to a file, e.g. with `ntfscat`.
///
/// The handle is shared behind a mutex so the stream can be read from
/// several traversals.
#[derive(Debug)]
pub struct FileStream {
    file: Mutex<File>,
    len: u64,
    cluster_size: u32,
}

impl FileStream {
    /// Open the stream at `path`.
    pub fn open(path: &Path, cluster_size: u32) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        debug!(path = %path.display(), len, cluster_size, "Opened allocation stream");

        Ok(FileStream {
            file: Mutex::new(file),
            len,
            cluster_size,
        })
    }
}

impl ClusterStream for FileStream {
    fn read_vcn(&self, vcn: u64, dest: &mut [u8], cluster_count: usize) -> io::Result<usize> {
        let clusters = clamp_request(
            vcn,
            dest,
            cluster_count,
            self.cluster_size,
            self.vcn_count(),
        )?;
        if clusters == 0 {
            return Ok(0);
        }

        let cluster_size = self.cluster_size as u64;
        let start = vcn * cluster_size;
        let len = clusters as u64 * cluster_size;
        let available = (self.len - start).min(len) as usize;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut dest[..available])?;
        dest[available..len as usize].fill(0);

        Ok(clusters)
    }

    fn vcn_count(&self) -> u64 {
        clusters_for(self.len, self.cluster_size)
    }
}

/// A file record made of a dumped `$INDEX_ROOT` value plus optional
/// `$INDEX_ALLOCATION` extents.
///
/// Only the index attributes of the configured name are exposed.
#[derive(Clone)]
pub struct DumpRecord {
    name: String,
    cluster_size: u32,
    root: Arc<[u8]>,
    extents: Vec<Arc<dyn ClusterStream>>,
}

impl DumpRecord {
    /// Create a record exposing `root` as the index root named `name`.
    pub fn new(name: impl Into<String>, root: impl Into<Arc<[u8]>>, cluster_size: u32) -> Self {
        DumpRecord {
            name: name.into(),
            cluster_size,
            root: root.into(),
            extents: Vec::new(),
        }
    }

    /// Append an allocation extent
    pub fn with_extent(mut self, extent: Arc<dyn ClusterStream>) -> Self {
        self.extents.push(extent);
        self
    }

    /// Load a root dump and allocation stream files from disk.
    pub fn open(
        name: impl Into<String>,
        root_path: &Path,
        allocation_paths: &[impl AsRef<Path>],
        cluster_size: u32,
    ) -> Result<Self> {
        let root = fs::read(root_path)?;
        let mut record = DumpRecord::new(name, root, cluster_size);
        for path in allocation_paths {
            record = record.with_extent(Arc::new(FileStream::open(path.as_ref(), cluster_size)?));
        }
        Ok(record)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FileRecord for DumpRecord {
    fn cluster_size(&self) -> u32 {
        self.cluster_size
    }

    fn find_attributes(&self, ty: AttributeType, name: &str) -> Result<Vec<Attribute>> {
        if name != self.name {
            return Ok(Vec::new());
        }

        Ok(match ty {
            AttributeType::IndexRoot => vec![Attribute::Resident(self.root.clone())],
            AttributeType::IndexAllocation => self
                .extents
                .iter()
                .cloned()
                .map(Attribute::NonResident)
                .collect(),
            _ => Vec::new(),
        })
    }
}
