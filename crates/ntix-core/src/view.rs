//! Bounds-checked little-endian reads over on-disk structures.

use crate::error::{IndexError, Result};

/// A read-only window onto a byte buffer starting at `base`.
///
/// All offsets passed to the accessors are relative to `base`. Every read is
/// bounds-checked against the full buffer and fails with
/// [`IndexError::OutOfBounds`] instead of truncating.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    data: &'a [u8],
    base: usize,
}

impl<'a> ByteView<'a> {
    /// Create a view of `data` starting at `base`.
    pub fn new(data: &'a [u8], base: usize) -> Self {
        ByteView { data, base }
    }

    /// Absolute offset of this view within the underlying buffer
    pub fn base(&self) -> usize {
        self.base
    }

    /// Number of bytes from `base` to the end of the buffer
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.base)
    }

    /// A new view whose base is `offset` bytes past this one.
    pub fn at(&self, offset: usize) -> ByteView<'a> {
        ByteView {
            data: self.data,
            base: self.base.saturating_add(offset),
        }
    }

    /// Borrow `len` bytes at `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let start = self.base.checked_add(offset);
        let end = start.and_then(|s| s.checked_add(len));
        match (start, end) {
            (Some(start), Some(end)) if end <= self.data.len() => Ok(&self.data[start..end]),
            _ => Err(IndexError::OutOfBounds {
                offset: self.base.saturating_add(offset),
                len,
                size: self.data.len(),
            }),
        }
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(offset, N)?);
        Ok(out)
    }

    pub fn u8(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes(offset, 1)?[0])
    }

    pub fn u16(&self, offset: usize) -> Result<u16> {
        self.array(offset).map(u16::from_le_bytes)
    }

    pub fn u32(&self, offset: usize) -> Result<u32> {
        self.array(offset).map(u32::from_le_bytes)
    }

    /// Read a 48-bit unsigned value (6 bytes) into a `u64`.
    pub fn u48(&self, offset: usize) -> Result<u64> {
        let raw: [u8; 6] = self.array(offset)?;
        let mut wide = [0u8; 8];
        wide[..6].copy_from_slice(&raw);
        Ok(u64::from_le_bytes(wide))
    }

    pub fn u64(&self, offset: usize) -> Result<u64> {
        self.array(offset).map(u64::from_le_bytes)
    }

    pub fn i64(&self, offset: usize) -> Result<i64> {
        self.array(offset).map(i64::from_le_bytes)
    }
}
