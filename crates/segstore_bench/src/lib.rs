//! Benchmark utilities.

use segstore_core::{Config, GroupId, SegmentStore};
use tempfile::TempDir;

/// Generate deterministic data of the specified size.
pub fn pattern_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Open a store in a fresh temporary root.
pub fn temp_store(config: Config) -> (TempDir, SegmentStore) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = SegmentStore::open(temp_dir.path(), config).expect("Failed to open store");
    (temp_dir, store)
}

/// Create `per_group` segments of `size` bytes in each of `groups` groups.
pub fn populate(store: &mut SegmentStore, groups: u64, per_group: usize, size: u64) {
    for group in 0..groups {
        for _ in 0..per_group {
            store
                .create(GroupId::new(group), size)
                .expect("Failed to create segment");
        }
    }
}
