//! # SegStore Testkit
//!
//! Test utilities for SegStore.
//!
//! This crate provides:
//! - Temporary store fixtures with simulated restarts
//! - Property-based test generators using proptest
//! - A model harness that mirrors store operations and checks the store,
//!   its index, and the storage root against the model
//!
//! ## Usage
//!
//! ```rust,ignore
//! use segstore_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_temp_store(|store| {
//!         let address = store.create(GroupId::new(1), 64).unwrap();
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use segstore_core::{Config, GroupId, SegmentKey, SegmentStore, Version};
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
