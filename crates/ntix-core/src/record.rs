//! Collaborator interfaces consumed by the index engine.
//!
//! The engine does not decode MFT records or run lists itself. A file record
//! implementation hands it raw attribute values:
//!
//! - resident attributes as their value bytes
//! - non-resident attributes as a [`ClusterStream`] that reads clusters by VCN
//!
//! All decoding of record fixups and data runs happens behind these traits.

use crate::error::Result;
use crate::types::AttributeType;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Cluster-granular access to one non-resident attribute extent.
///
/// VCNs are filesystem clusters relative to the start of this extent.
pub trait ClusterStream: Send + Sync {
    /// Read up to `cluster_count` clusters starting at `vcn` into `dest`.
    ///
    /// `dest` holds at least `cluster_count * cluster_size` bytes. Returns the
    /// number of clusters actually read, which may be less than requested at
    /// the end of the extent.
    fn read_vcn(&self, vcn: u64, dest: &mut [u8], cluster_count: usize) -> io::Result<usize>;

    /// Number of clusters covered by this extent
    fn vcn_count(&self) -> u64;
}

/// A raw attribute value as returned by the file record.
#[derive(Clone)]
pub enum Attribute {
    /// Value bytes stored inside the record
    Resident(Arc<[u8]>),

    /// Value stored in clusters elsewhere on the volume
    NonResident(Arc<dyn ClusterStream>),
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Resident(data) => write!(f, "Resident({} bytes)", data.len()),
            Attribute::NonResident(stream) => {
                write!(f, "NonResident({} clusters)", stream.vcn_count())
            }
        }
    }
}

/// The MFT file record that owns an index.
pub trait FileRecord: Send + Sync {
    /// Filesystem cluster size in bytes
    fn cluster_size(&self) -> u32;

    /// All attributes with the given type and name, in record order.
    ///
    /// A non-resident attribute split over an attribute list yields one
    /// [`Attribute::NonResident`] per extent, in VCN order.
    fn find_attributes(&self, ty: AttributeType, name: &str) -> Result<Vec<Attribute>>;
}

impl<R: FileRecord + ?Sized> FileRecord for Arc<R> {
    fn cluster_size(&self) -> u32 {
        (**self).cluster_size()
    }

    fn find_attributes(&self, ty: AttributeType, name: &str) -> Result<Vec<Attribute>> {
        (**self).find_attributes(ty, name)
    }
}
