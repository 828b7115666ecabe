//! Core value types shared by the index structures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Virtual Cluster Number within an index's allocation stream.
///
/// Subnode pointers and block headers express VCNs in *index clusters*
/// (`index_block_size / clusters_per_index_block` bytes), not filesystem
/// clusters. The on-disk field is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Vcn(pub i64);

impl Vcn {
    /// Create a new VCN
    pub fn new(vcn: i64) -> Self {
        Vcn(vcn)
    }

    /// Get the raw value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Vcn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Vcn {
    fn from(vcn: i64) -> Self {
        Vcn(vcn)
    }
}

/// Reference to an MFT file record.
///
/// The low 48 bits hold the record number, the high 16 bits the sequence
/// number that detects reuse of the record slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileReference(pub u64);

impl FileReference {
    /// The root directory's MFT record number
    pub const ROOT_RECORD: u64 = 5;

    /// Create a file reference from its raw 64-bit value
    pub fn new(raw: u64) -> Self {
        FileReference(raw)
    }

    /// Build a reference from its two halves
    pub fn from_parts(record_number: u64, sequence_number: u16) -> Self {
        FileReference((record_number & 0xFFFF_FFFF_FFFF) | ((sequence_number as u64) << 48))
    }

    /// The 48-bit MFT record number
    pub fn record_number(&self) -> u64 {
        self.0 & 0xFFFF_FFFF_FFFF
    }

    /// The 16-bit sequence number
    pub fn sequence_number(&self) -> u16 {
        (self.0 >> 48) as u16
    }

    /// Get the raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.record_number(), self.sequence_number())
    }
}

/// NTFS attribute type codes relevant to indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    FileName,
    IndexRoot,
    IndexAllocation,
    Bitmap,
    Other(u32),
}

impl AttributeType {
    /// Decode an on-disk attribute type code
    pub fn from_code(code: u32) -> Self {
        match code {
            0x30 => AttributeType::FileName,
            0x90 => AttributeType::IndexRoot,
            0xA0 => AttributeType::IndexAllocation,
            0xB0 => AttributeType::Bitmap,
            other => AttributeType::Other(other),
        }
    }

    /// The on-disk attribute type code
    pub fn code(&self) -> u32 {
        match self {
            AttributeType::FileName => 0x30,
            AttributeType::IndexRoot => 0x90,
            AttributeType::IndexAllocation => 0xA0,
            AttributeType::Bitmap => 0xB0,
            AttributeType::Other(code) => *code,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::FileName => write!(f, "$FILE_NAME"),
            AttributeType::IndexRoot => write!(f, "$INDEX_ROOT"),
            AttributeType::IndexAllocation => write!(f, "$INDEX_ALLOCATION"),
            AttributeType::Bitmap => write!(f, "$BITMAP"),
            AttributeType::Other(code) => write!(f, "0x{:X}", code),
        }
    }
}

/// Key ordering rule declared by an index root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollationRule {
    Binary,
    FileName,
    UnicodeString,
    Ulong,
    Sid,
    SecurityHash,
    Ulongs,
    Other(u32),
}

impl CollationRule {
    pub fn from_code(code: u32) -> Self {
        match code {
            0x00 => CollationRule::Binary,
            0x01 => CollationRule::FileName,
            0x02 => CollationRule::UnicodeString,
            0x10 => CollationRule::Ulong,
            0x11 => CollationRule::Sid,
            0x12 => CollationRule::SecurityHash,
            0x13 => CollationRule::Ulongs,
            other => CollationRule::Other(other),
        }
    }
}

impl fmt::Display for CollationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollationRule::Binary => write!(f, "binary"),
            CollationRule::FileName => write!(f, "file-name"),
            CollationRule::UnicodeString => write!(f, "unicode-string"),
            CollationRule::Ulong => write!(f, "ulong"),
            CollationRule::Sid => write!(f, "sid"),
            CollationRule::SecurityHash => write!(f, "security-hash"),
            CollationRule::Ulongs => write!(f, "ulongs"),
            CollationRule::Other(code) => write!(f, "0x{:X}", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_reference_parts() {
        let reference = FileReference::new(0x0003_0000_0000_0024);
        assert_eq!(reference.record_number(), 0x24);
        assert_eq!(reference.sequence_number(), 3);
        assert_eq!(reference.to_string(), "36-3");

        assert_eq!(FileReference::from_parts(0x24, 3), reference);
    }

    #[test]
    fn test_attribute_type_codes() {
        assert_eq!(AttributeType::from_code(0x90), AttributeType::IndexRoot);
        assert_eq!(AttributeType::IndexAllocation.code(), 0xA0);
        assert_eq!(AttributeType::from_code(0x100), AttributeType::Other(0x100));
    }

    #[test]
    fn test_collation_rule() {
        assert_eq!(CollationRule::from_code(1), CollationRule::FileName);
        assert_eq!(CollationRule::from_code(0x13).to_string(), "ulongs");
    }
}
