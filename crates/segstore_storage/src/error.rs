//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred on a segment file.
    #[error("I/O error during {op} of {}: {source}", path.display())]
    Io {
        /// The operation that failed.
        op: &'static str,
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Exclusive creation found an existing file.
    #[error("segment file already exists: {}", path.display())]
    AlreadyExists {
        /// The conflicting path.
        path: PathBuf,
    },

    /// The kernel refused to establish the mapping.
    #[error("failed to map {}: {source}", path.display())]
    Map {
        /// The file being mapped.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The file length cannot back a mapping.
    #[error("cannot map {} with length {len}", path.display())]
    InvalidLength {
        /// The file being mapped.
        path: PathBuf,
        /// The offending length in bytes.
        len: u64,
    },
}

impl StorageError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
