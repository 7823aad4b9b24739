//! # SegStore Storage
//!
//! Segment files and shared memory mappings for SegStore.
//!
//! This crate provides the lowest-level building blocks of the store.
//! Segment contents are **opaque bytes**: nothing here interprets what a
//! caller writes into a mapped region.
//!
//! ## Design Principles
//!
//! - A segment file is created exclusively and sized once
//! - A region is a read/write `MAP_SHARED` mapping of a whole segment file
//! - No knowledge of groups, versions, or directory layout
//! - SegStore core owns naming, indexing, and recovery
//!
//! ## Example
//!
//! ```rust
//! use segstore_storage::{MappedRegion, SegmentFile};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let file = SegmentFile::create_new(&dir.path().join("1")).unwrap();
//! file.set_len(64).unwrap();
//!
//! let mut region = MappedRegion::map(&file).unwrap();
//! region.as_mut_slice().fill(b'f');
//! assert_eq!(region.len(), 64);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod region;

pub use error::{StorageError, StorageResult};
pub use file::SegmentFile;
pub use region::MappedRegion;
