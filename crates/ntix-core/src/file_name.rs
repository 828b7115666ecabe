//! `$FILE_NAME` keys of directory (`$I30`) indexes.
//!
//! ## Key Layout
//!
//! ```text
//! +0x00  u64  parent directory reference
//! +0x08  i64  creation time (FILETIME)
//! +0x10  i64  modification time
//! +0x18  i64  MFT record change time
//! +0x20  i64  last access time
//! +0x28  u64  allocated size
//! +0x30  u64  real size
//! +0x38  u32  file attribute flags
//! +0x3C  u32  reparse tag / EA size
//! +0x40  u8   name length in UTF-16 code units
//! +0x41  u8   namespace
//! +0x42  ...  name (UTF-16LE)
//! ```

use crate::entry::IndexEntry;
use crate::error::{IndexError, Result};
use crate::index::IndexSearchCallback;
use crate::types::FileReference;
use crate::view::ByteView;
use chrono::{DateTime, TimeZone, Utc};
use std::cmp::Ordering;
use tracing::warn;

/// Size of the fixed fields preceding the name
const FILE_NAME_HEADER_SIZE: usize = 0x42;

/// File attribute flag: the record is a directory
pub const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x10;
/// File attribute flag set on `$FILE_NAME` copies of directories
pub const FILE_NAME_INDEX_PRESENT: u32 = 0x1000_0000;

/// Convert a FILETIME (100ns ticks since 1601) to a UTC timestamp.
pub fn filetime_to_datetime(ft: i64) -> Option<DateTime<Utc>> {
    // FILETIME is 100-nanosecond intervals since January 1, 1601
    const FILETIME_UNIX_DIFF: i64 = 116444736000000000;
    const TICKS_PER_SECOND: i64 = 10_000_000;

    if ft == 0 {
        return None;
    }

    let unix_ticks = ft.checked_sub(FILETIME_UNIX_DIFF)?;
    let seconds = unix_ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = (unix_ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;

    Utc.timestamp_opt(seconds, nanos).single()
}

/// Which naming convention a file name entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileNamespace {
    Posix,
    Win32,
    Dos,
    Win32AndDos,
    Unknown(u8),
}

impl FileNamespace {
    fn from_code(code: u8) -> Self {
        match code {
            0 => FileNamespace::Posix,
            1 => FileNamespace::Win32,
            2 => FileNamespace::Dos,
            3 => FileNamespace::Win32AndDos,
            other => FileNamespace::Unknown(other),
        }
    }
}

/// A decoded `$FILE_NAME` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileName {
    pub parent: FileReference,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub mft_modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    pub allocated_size: u64,
    pub real_size: u64,
    pub attributes: u32,
    pub namespace: FileNamespace,
    units: Vec<u16>,
}

impl FileName {
    /// Decode the content bytes of an index entry.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let view = ByteView::new(content, 0);
        let length = view.u8(0x40)? as usize;
        let raw = view.bytes(FILE_NAME_HEADER_SIZE, length * 2).map_err(|_| {
            IndexError::corrupt(format!(
                "file name of {} units does not fit in {} content bytes",
                length,
                content.len()
            ))
        })?;

        let units = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(FileName {
            parent: FileReference::new(view.u64(0x00)?),
            created: filetime_to_datetime(view.i64(0x08)?),
            modified: filetime_to_datetime(view.i64(0x10)?),
            mft_modified: filetime_to_datetime(view.i64(0x18)?),
            accessed: filetime_to_datetime(view.i64(0x20)?),
            allocated_size: view.u64(0x28)?,
            real_size: view.u64(0x30)?,
            attributes: view.u32(0x38)?,
            namespace: FileNamespace::from_code(view.u8(0x41)?),
            units,
        })
    }

    /// Decode the key of an index entry.
    pub fn from_entry(entry: &IndexEntry) -> Result<Self> {
        FileName::parse(entry.content())
    }

    /// The name as raw UTF-16 code units
    pub fn name_units(&self) -> &[u16] {
        &self.units
    }

    /// The name, with unpaired surrogates replaced
    pub fn name(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }

    pub fn is_directory(&self) -> bool {
        self.attributes & (FILE_ATTRIBUTE_DIRECTORY | FILE_NAME_INDEX_PRESENT) != 0
    }

    /// True for the short 8.3 alias that accompanies a long Win32 name
    pub fn is_dos_only(&self) -> bool {
        self.namespace == FileNamespace::Dos
    }
}

/// Upper-case one UTF-16 code unit.
///
/// Surrogates and characters whose upper case form is not a single BMP code
/// unit are left unchanged, which matches the volume `$UpCase` table for
/// everything but a handful of legacy mappings.
fn upcase_unit(unit: u16) -> u16 {
    let Some(c) = char::from_u32(unit as u32) else {
        return unit;
    };
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) if (u as u32) <= 0xFFFF => u as u16,
        _ => unit,
    }
}

fn upcase(units: &[u16]) -> Vec<u16> {
    units.iter().map(|&u| upcase_unit(u)).collect()
}

/// Search callback implementing the `COLLATION_FILE_NAME` rule.
///
/// Names compare as upper-cased UTF-16 code unit sequences, so lookups are
/// case-insensitive the way Windows resolves paths.
#[derive(Debug, Clone)]
pub struct FileNameCollation {
    sought: Vec<u16>,
    visited: usize,
}

impl FileNameCollation {
    pub fn new(name: &str) -> Self {
        let units: Vec<u16> = name.encode_utf16().collect();
        FileNameCollation {
            sought: upcase(&units),
            visited: 0,
        }
    }

    /// Number of entries compared so far
    pub fn visited(&self) -> usize {
        self.visited
    }
}

impl IndexSearchCallback for FileNameCollation {
    fn visit_and_compare_entry(&mut self, entry: &IndexEntry) -> Ordering {
        self.visited += 1;
        match FileName::from_entry(entry) {
            Ok(file_name) => self.sought.as_slice().cmp(upcase(file_name.name_units()).as_slice()),
            Err(e) => {
                // Treat an undecodable key as smaller than the sought name and move on.
                warn!(offset = entry.offset(), error = %e, "Skipping unreadable file name key");
                Ordering::Greater
            }
        }
    }
}
