//! # SegStore Core
//!
//! Persistent, versioned store of shared-memory segments.
//!
//! This crate provides:
//! - A storage root layout of group directories and segment files
//! - A bidirectional segment index keyed by `(group, version)` and address
//! - Version allocation by directory scan or index query
//! - Startup recovery that re-maps every segment found on disk
//! - The [`SegmentStore`] with create and delete operations
//!
//! ## Example
//!
//! ```rust
//! use segstore_core::{Config, GroupId, SegmentStore};
//!
//! let root = tempfile::tempdir().unwrap();
//! let mut store = SegmentStore::open(root.path(), Config::default()).unwrap();
//!
//! let address = store.create(GroupId::new(1), 128).unwrap();
//! store.segment_mut(address).unwrap().fill(b'f');
//! assert_eq!(store.info(address).unwrap().key.version.as_u64(), 1);
//!
//! store.delete(address).unwrap();
//! assert!(store.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allocator;
mod config;
pub mod dir;
mod error;
mod index;
mod recovery;
mod stats;
mod store;
mod types;

pub use allocator::VersionAllocator;
pub use config::{Config, VersionPolicy, DEFAULT_ROOT};
pub use dir::{GroupLayout, Layout, SegmentLayout, StoreDir};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use index::{IndexEntry, SegmentIndex};
pub use recovery::{recover, RecoveryReport};
pub use segstore_storage::{MappedRegion, StorageError};
pub use stats::StoreStats;
pub use store::SegmentStore;
pub use types::{GroupId, SegmentAddress, SegmentInfo, SegmentKey, Version};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
