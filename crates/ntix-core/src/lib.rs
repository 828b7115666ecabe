//! # ntix Core Library
//!
//! This crate reads NTFS indexes: the B+trees NTFS uses for directories
//! (`$I30`) and for lookups such as `$Secure:$SDH`. It resolves keyed
//! lookups and full enumerations across the resident root node and the
//! non-resident index blocks addressed by VCN.
//!
//! Decoding MFT records and data runs is left to the caller, who supplies
//! them through the [`FileRecord`] and [`ClusterStream`] traits.
//!
//! ## Architecture
//!
//! - **View** (`view`): Bounds-checked reads over raw bytes
//! - **Entries** (`entry`, `header`): Index entries and node headers
//! - **Nodes** (`root`, `block`): The resident root and non-resident blocks
//! - **Allocation** (`allocation`): Index VCN to filesystem cluster translation
//! - **Index** (`index`): Search and breadth-first enumeration
//! - **File names** (`file_name`): `$FILE_NAME` keys and their collation
//! - **Sources** (`source`): In-memory and file-backed collaborators
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust,ignore
//! use ntix_core::{DumpRecord, FileNameCollation, NtfsIndex};
//!
//! let record = DumpRecord::open("$I30", root_path, &[alloc_path], 4096)?;
//! let index = NtfsIndex::new(record, "$I30");
//!
//! if let Some(entry) = index.search(&mut FileNameCollation::new("readme.txt"))? {
//!     println!("record {}", entry.file_reference_number());
//! }
//! ```

pub mod allocation;
pub mod block;
pub mod config;
pub mod entry;
pub mod error;
pub mod file_name;
pub mod header;
pub mod index;
pub mod record;
pub mod root;
pub mod source;
pub mod types;
pub mod view;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use allocation::{BlockLocation, IndexAllocation};
pub use block::IndexBlock;
pub use config::Config;
pub use entry::{IndexEntry, IndexEntryFlags};
pub use error::{IndexError, Result};
pub use file_name::{FileName, FileNameCollation, FileNamespace};
pub use header::{IndexEntries, IndexHeader};
pub use index::{IndexIter, IndexSearchCallback, NtfsIndex};
pub use record::{Attribute, ClusterStream, FileRecord};
pub use root::IndexRoot;
pub use source::{DumpRecord, FileStream, MemoryStream};
pub use types::{AttributeType, CollationRule, FileReference, Vcn};
pub use view::ByteView;
