//! Test fixtures and store helpers.
//!
//! Provides temporary stores rooted in a fresh directory, and a way to
//! simulate a process restart against the same root.

use segstore_core::{Config, SegmentKey, SegmentStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance, `None` only while reopening.
    store: Option<SegmentStore>,
    /// Configuration used for every open.
    config: Config,
    /// The temporary root (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestStore {
    /// Creates a store in a new temporary root with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a store in a new temporary root.
    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store =
            SegmentStore::open(temp_dir.path(), config.clone()).expect("Failed to open store");
        Self {
            store: Some(store),
            config,
            temp_dir,
        }
    }

    /// Returns the storage root.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Returns the directory of a group.
    pub fn group_dir(&self, group: u64) -> PathBuf {
        self.root().join(group.to_string())
    }

    /// Drops the store, releasing every mapping, and opens it again.
    ///
    /// The new store recovers its index from disk only.
    pub fn reopen(&mut self) {
        drop(self.store.take());
        let store = SegmentStore::open(self.root(), self.config.clone())
            .expect("Failed to reopen store");
        self.store = Some(store);
    }

    /// Returns the sorted entry names of a group directory, or `None` if the
    /// directory doesn't exist.
    pub fn group_entries(&self, group: u64) -> Option<Vec<String>> {
        let entries = std::fs::read_dir(self.group_dir(group)).ok()?;
        let mut names: Vec<String> = entries
            .map(|e| {
                e.expect("Failed to read entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        Some(names)
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = SegmentStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref().expect("store is open")
    }
}

impl std::ops::DerefMut for TestStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.store.as_mut().expect("store is open")
    }
}

/// Runs a test with a temporary store.
///
/// # Example
///
/// ```rust,ignore
/// use segstore_testkit::with_temp_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_store(|store| {
///         store.create(GroupId::new(1), 16).unwrap();
///     });
/// }
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&mut SegmentStore) -> R,
{
    let mut test_store = TestStore::new();
    f(&mut test_store)
}

/// Returns a deterministic byte pattern for a segment.
///
/// Different keys and seeds give different patterns, so a segment read back
/// with the wrong contents is detected.
pub fn fill_pattern(key: SegmentKey, seed: u8, len: usize) -> Vec<u8> {
    let base = key
        .group
        .as_u64()
        .wrapping_mul(31)
        .wrapping_add(key.version.as_u64().wrapping_mul(7))
        .wrapping_add(u64::from(seed));
    (0..len)
        .map(|i| (base.wrapping_add(i as u64) % 251) as u8)
        .collect()
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use segstore_core::GroupId;

    /// Creates a store with `groups` groups of `per_group` segments each,
    /// every segment filled with its [`fill_pattern`].
    pub fn populated_store(groups: u64, per_group: usize, size: u64) -> TestStore {
        let mut test_store = TestStore::new();

        for group in 0..groups {
            for _ in 0..per_group {
                let address = test_store
                    .create(GroupId::new(group), size)
                    .expect("Failed to create segment");
                let key = test_store.info(address).expect("Segment not indexed").key;
                let pattern = fill_pattern(key, 0, size as usize);
                test_store
                    .segment_mut(address)
                    .expect("Segment not mapped")
                    .copy_from_slice(&pattern);
            }
        }

        test_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segstore_core::{GroupId, Version};

    #[test]
    fn reopen_recovers_segments() {
        let mut test_store = TestStore::new();
        let address = test_store.create(GroupId::new(1), 32).unwrap();
        test_store.segment_mut(address).unwrap().fill(5);

        test_store.reopen();
        assert_eq!(test_store.recovery_report().segments, 1);

        let key = SegmentKey::new(GroupId::new(1), Version::new(1));
        let info = test_store.lookup(key).unwrap();
        assert_eq!(test_store.segment(info.address).unwrap(), &[5u8; 32][..]);
    }

    #[test]
    fn group_entries_lists_names() {
        let mut test_store = TestStore::new();
        assert!(test_store.group_entries(4).is_none());

        test_store.create(GroupId::new(4), 8).unwrap();
        test_store.create(GroupId::new(4), 8).unwrap();
        assert_eq!(
            test_store.group_entries(4).unwrap(),
            vec!["1".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn fill_pattern_depends_on_key() {
        let a = SegmentKey::new(GroupId::new(1), Version::new(1));
        let b = SegmentKey::new(GroupId::new(1), Version::new(2));
        assert_ne!(fill_pattern(a, 0, 16), fill_pattern(b, 0, 16));
        assert_ne!(fill_pattern(a, 0, 16), fill_pattern(a, 1, 16));
        assert_eq!(fill_pattern(a, 3, 16), fill_pattern(a, 3, 16));
    }

    #[test]
    fn populated_store_layout() {
        let test_store = scenarios::populated_store(3, 2, 64);
        assert_eq!(test_store.len(), 6);
        assert_eq!(test_store.stats().groups, 3);
        for group in 0..3 {
            assert_eq!(test_store.group_entries(group).unwrap().len(), 2);
        }
    }

    #[test]
    fn with_temp_store_runs_closure() {
        let len = with_temp_store(|store| {
            store.create(GroupId::new(0), 1).unwrap();
            store.len()
        });
        assert_eq!(len, 1);
    }
}
