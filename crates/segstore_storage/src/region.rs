//! Shared read/write mappings of segment files.

use crate::error::{StorageError, StorageResult};
use crate::file::SegmentFile;
use memmap2::{MmapMut, MmapOptions};
use std::fmt;

/// A read/write, shared mapping of an entire segment file.
///
/// Writes through the mapping are carried back to the file and are visible
/// to every other mapper of the same file. The mapping is released when the
/// region is dropped or [`MappedRegion::unmap`] is called; there is no way
/// to release part of it.
///
/// The base address is stable for the lifetime of the region and unique
/// among live mappings in the process.
pub struct MappedRegion {
    mmap: MmapMut,
}

impl MappedRegion {
    /// Maps the whole of `file` read/write with shared semantics.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidLength`] if the file is empty or larger
    /// than the address space, and [`StorageError::Map`] if the kernel
    /// refuses the mapping.
    pub fn map(file: &SegmentFile) -> StorageResult<Self> {
        let len = file.len()?;
        let map_len = usize::try_from(len)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| StorageError::InvalidLength {
                path: file.path().to_path_buf(),
                len,
            })?;

        // SAFETY: the mapping covers exactly the current file length and the
        // file is never resized while mapped. Truncation by a foreign process
        // is outside the contract of the store, as for any shared mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { MmapOptions::new().len(map_len).map_mut(file.as_file()) }.map_err(
            |source| StorageError::Map {
                path: file.path().to_path_buf(),
                source,
            },
        )?;

        Ok(Self { mmap })
    }

    /// Returns the base address of the mapping.
    #[inline]
    #[must_use]
    pub fn base_address(&self) -> usize {
        self.mmap.as_ptr() as usize
    }

    /// Returns the length of the mapping in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Always false: empty files are never mapped.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Returns the mapped bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Returns the mapped bytes for writing.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mmap
    }

    /// Releases the mapping.
    pub fn unmap(self) {
        drop(self.mmap);
    }
}

impl fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRegion")
            .field("base_address", &format_args!("{:#x}", self.base_address()))
            .field("len", &self.len())
            .finish()
    }
}
