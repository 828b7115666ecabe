//! Error types for index operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while the command-line front end uses `anyhow` for
//! convenient error handling.

use crate::types::{AttributeType, Vcn};
use thiserror::Error;

/// Result type alias using IndexError
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors raised while reading or traversing an NTFS index.
///
/// Every variant aborts the traversal that produced it. Callers may re-run
/// the whole operation; nothing here is retried internally.
#[derive(Error, Debug)]
pub enum IndexError {
    // === I/O Errors ===
    /// The cluster reader beneath the index failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer clusters came back than an index block needs
    #[error("short read at filesystem VCN {vcn}: requested {requested} clusters, read {read}")]
    ShortRead {
        vcn: u64,
        requested: usize,
        read: usize,
    },

    // === Structure Errors ===
    /// A structured read reached past the end of its buffer
    #[error("read of {len} bytes at offset {offset} exceeds buffer of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// The on-disk structure is malformed
    #[error("corrupt index: {reason}")]
    Corrupt { reason: String },

    // === Attribute Resolution Errors ===
    /// No attribute with this type and name exists in the file record
    #[error("attribute {ty} named {name:?} not found")]
    AttributeNotFound { ty: AttributeType, name: String },

    /// The attribute was expected to be resident
    #[error("attribute {ty} is unexpectedly non-resident")]
    UnexpectedNonResident { ty: AttributeType },

    /// The attribute was expected to be non-resident
    #[error("attribute {ty} is unexpectedly resident")]
    UnexpectedResident { ty: AttributeType },

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl IndexError {
    /// Create a corruption error
    pub fn corrupt(reason: impl Into<String>) -> Self {
        IndexError::Corrupt {
            reason: reason.into(),
        }
    }

    /// Create the error for a subnode VCN that leaves the allocation's extent
    pub(crate) fn vcn_out_of_range(vcn: Vcn, fs_vcn: u64, clusters: u64, total: u64) -> Self {
        IndexError::corrupt(format!(
            "subnode VCN {} maps to filesystem clusters {}..{} beyond the allocation's {} clusters",
            vcn,
            fs_vcn,
            fs_vcn + clusters,
            total
        ))
    }

    /// Returns true if this error describes damaged on-disk structures
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            IndexError::Corrupt { .. }
                | IndexError::OutOfBounds { .. }
                | IndexError::UnexpectedNonResident { .. }
                | IndexError::UnexpectedResident { .. }
        )
    }

    /// Returns true if this error is recoverable (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, IndexError::Io(_) | IndexError::ShortRead { .. })
    }
}
