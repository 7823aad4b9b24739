//! Error types for SegStore core.

use crate::types::{GroupId, SegmentAddress, SegmentKey};
use segstore_storage::StorageError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in SegStore core operations.
///
/// Every failure aborts the operation in progress without touching the
/// segment index. [`CoreError::kind`] classifies an error for callers that
/// only care about the category.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Segment file or mapping error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Directory-level I/O error.
    #[error("I/O error during {op} of {}: {source}", path.display())]
    Io {
        /// The operation that failed.
        op: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The storage root is missing or unusable.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// Another store holds the exclusive lock on the storage root.
    #[error("storage root locked: {}", path.display())]
    StoreLocked {
        /// The locked root.
        path: PathBuf,
    },

    /// Segment size is zero or not addressable.
    #[error("invalid segment size: {size}")]
    InvalidSize {
        /// The requested size.
        size: u64,
    },

    /// The version counter of a group is exhausted.
    #[error("version overflow in {group}")]
    VersionOverflow {
        /// The exhausted group.
        group: GroupId,
    },

    /// A freshly allocated version already has a backing file.
    #[error("segment {key} already exists at {}", path.display())]
    Collision {
        /// The allocated key.
        key: SegmentKey,
        /// The conflicting file.
        path: PathBuf,
    },

    /// The address is not a live segment of this store.
    #[error("no segment at address {address}")]
    NotFound {
        /// The unknown address.
        address: SegmentAddress,
    },

    /// Forward and reverse index entries disagree.
    #[error("segment index inconsistency: {message}")]
    IndexConsistency {
        /// Description of the disagreement.
        message: String,
    },
}

/// Category of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Storage root inaccessible or locked.
    Configuration,
    /// Version counter overflow.
    Allocation,
    /// Backing file exists where a fresh version was expected.
    Collision,
    /// Directory or file I/O failed.
    Io,
    /// Memory mapping could not be established.
    Mapping,
    /// Unknown segment address.
    NotFound,
    /// Forward and reverse index disagree.
    IndexConsistency,
    /// Caller passed an unusable argument.
    InvalidArgument,
}

impl CoreError {
    /// Creates a directory I/O error.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an index consistency error.
    pub fn index_consistency(message: impl Into<String>) -> Self {
        Self::IndexConsistency {
            message: message.into(),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(StorageError::Io { .. }) | Self::Io { .. } => ErrorKind::Io,
            Self::Storage(StorageError::AlreadyExists { .. }) | Self::Collision { .. } => {
                ErrorKind::Collision
            }
            Self::Storage(StorageError::Map { .. } | StorageError::InvalidLength { .. }) => {
                ErrorKind::Mapping
            }
            Self::Configuration { .. } | Self::StoreLocked { .. } => ErrorKind::Configuration,
            Self::InvalidSize { .. } => ErrorKind::InvalidArgument,
            Self::VersionOverflow { .. } => ErrorKind::Allocation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::IndexConsistency { .. } => ErrorKind::IndexConsistency,
        }
    }
}
