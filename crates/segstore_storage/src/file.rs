//! Segment backing files.

use crate::error::{StorageError, StorageResult};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// An open segment backing file.
///
/// The handle is only needed while a segment is being created or mapped.
/// A mapping stays valid after the file is closed, so callers usually drop
/// the `SegmentFile` as soon as [`crate::MappedRegion::map`] returns.
///
/// # Example
///
/// ```no_run
/// use segstore_storage::SegmentFile;
/// use std::path::Path;
///
/// let file = SegmentFile::create_new(Path::new("/dev/shm/1/1")).unwrap();
/// file.set_len(128).unwrap();
/// ```
#[derive(Debug)]
pub struct SegmentFile {
    path: PathBuf,
    file: File,
}

impl SegmentFile {
    /// Creates a new, empty segment file.
    ///
    /// Creation is exclusive: an existing file at `path` is never opened or
    /// truncated.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the file exists, or
    /// [`StorageError::Io`] for any other failure.
    pub fn create_new(path: &Path) -> StorageResult<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = options.open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                StorageError::AlreadyExists {
                    path: path.to_path_buf(),
                }
            } else {
                StorageError::io("create", path, e)
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Opens an existing segment file for reading and writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| StorageError::io("open", path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Sets the file length to exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be resized.
    pub fn set_len(&self, len: u64) -> StorageResult<()> {
        self.file
            .set_len(len)
            .map_err(|e| StorageError::io("resize", &self.path, e))
    }

    /// Returns the current file length in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read.
    pub fn len(&self) -> StorageResult<u64> {
        let metadata = self
            .file
            .metadata()
            .map_err(|e| StorageError::io("stat", &self.path, e))?;
        Ok(metadata.len())
    }

    /// Returns true if the file has zero length.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn as_file(&self) -> &File {
        &self.file
    }
}
