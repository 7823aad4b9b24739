//! Model-based integration harness.
//!
//! [`ModelHarness`] applies operations to a real store and to an in-memory
//! model side by side, then checks that the store's index, its mapped
//! contents, and the storage root all agree with the model.

use crate::fixtures::TestStore;
use crate::generators::Op;
use segstore_core::{Config, ErrorKind, GroupId, SegmentKey, Version};
use std::collections::BTreeMap;

/// Runs store operations against a model of the expected state.
pub struct ModelHarness {
    store: TestStore,
    model: BTreeMap<SegmentKey, Vec<u8>>,
}

impl ModelHarness {
    /// Creates a harness over a fresh store with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a harness over a fresh store.
    pub fn with_config(config: Config) -> Self {
        Self {
            store: TestStore::with_config(config),
            model: BTreeMap::new(),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &TestStore {
        &self.store
    }

    /// Returns the number of live segments in the model.
    pub fn live(&self) -> usize {
        self.model.len()
    }

    /// Returns the version the next create in `group` must receive.
    pub fn expected_version(&self, group: GroupId) -> Version {
        let max = self
            .model
            .keys()
            .filter(|key| key.group == group)
            .map(|key| key.version.as_u64())
            .max()
            .unwrap_or(0);
        Version::new(max + 1)
    }

    /// Applies one operation.
    pub fn apply(&mut self, op: &Op) {
        match *op {
            Op::Create { group, size } => {
                self.create(group, size);
            }
            Op::Delete { pick } => {
                if let Some(key) = self.pick(pick) {
                    self.delete(key);
                }
            }
            Op::Write { pick, byte } => {
                if let Some(key) = self.pick(pick) {
                    self.write(key, byte);
                }
            }
            Op::Reopen => self.reopen(),
        }
    }

    /// Creates a segment and checks the assigned version.
    pub fn create(&mut self, group: GroupId, size: u64) -> SegmentKey {
        let expected = SegmentKey::new(group, self.expected_version(group));
        let address = self
            .store
            .create(group, size)
            .expect("create should succeed");

        let info = self.store.info(address).expect("new segment is indexed");
        assert_eq!(info.key, expected, "unexpected version assigned");
        assert_eq!(info.size, size);

        let contents = self.store.segment(address).expect("new segment is mapped");
        assert!(contents.iter().all(|&b| b == 0), "new segment not zeroed");

        self.model.insert(expected, vec![0u8; size as usize]);
        expected
    }

    /// Deletes a live segment by key.
    pub fn delete(&mut self, key: SegmentKey) {
        let info = self.store.lookup(key).expect("live segment is indexed");
        self.store
            .delete(info.address)
            .expect("delete should succeed");

        let err = self
            .store
            .delete(info.address)
            .expect_err("second delete must fail");
        assert_eq!(err.kind(), ErrorKind::NotFound);

        self.model.remove(&key);
    }

    /// Fills a live segment with `byte`.
    pub fn write(&mut self, key: SegmentKey, byte: u8) {
        let info = self.store.lookup(key).expect("live segment is indexed");
        self.store
            .segment_mut(info.address)
            .expect("live segment is mapped")
            .fill(byte);
        if let Some(contents) = self.model.get_mut(&key) {
            contents.fill(byte);
        }
    }

    /// Drops the store and recovers it from disk.
    pub fn reopen(&mut self) {
        self.store.reopen();
        assert_eq!(self.store.recovery_report().segments, self.model.len());
    }

    /// Checks the store and the storage root against the model.
    pub fn verify_all(&self) {
        assert_eq!(self.store.len(), self.model.len(), "index size mismatch");

        for (key, expected) in &self.model {
            let info = self
                .store
                .lookup(*key)
                .unwrap_or_else(|| panic!("{key} missing from index"));
            assert_eq!(info.size, expected.len() as u64);
            assert_eq!(self.store.info(info.address), Some(info));

            let contents = self.store.segment(info.address).expect("segment is mapped");
            assert_eq!(contents, expected.as_slice(), "{key} contents differ");
        }

        let mut groups: BTreeMap<GroupId, Vec<String>> = BTreeMap::new();
        for key in self.model.keys() {
            groups
                .entry(key.group)
                .or_default()
                .push(key.version.as_u64().to_string());
        }
        for names in groups.values_mut() {
            names.sort();
        }

        for group in (0..4).map(GroupId::new) {
            let on_disk = self.store.group_entries(group.as_u64());
            match groups.get(&group) {
                Some(names) => assert_eq!(on_disk.as_ref(), Some(names), "{group} files differ"),
                None => assert!(on_disk.is_none(), "{group} directory should be removed"),
            }
        }
    }

    fn pick(&self, pick: usize) -> Option<SegmentKey> {
        if self.model.is_empty() {
            return None;
        }
        self.model.keys().nth(pick % self.model.len()).copied()
    }
}

impl Default for ModelHarness {
    fn default() -> Self {
        Self::new()
    }
}
