//! Bidirectional segment index.
//!
//! The index maps `(group, version)` to the segment's base address and size,
//! and each address back to its key. Both directions are updated together:
//! an insert or remove either changes both maps or neither.
//!
//! The forward map is ordered by key, so the greatest version of a group is
//! a range query rather than a scan.

use crate::error::{CoreError, CoreResult};
use crate::types::{GroupId, SegmentAddress, SegmentInfo, SegmentKey, Version};
use std::collections::{BTreeMap, HashMap};

/// A forward index entry.
///
/// `value` carries whatever the owner attaches to a live segment; the store
/// keeps the segment's mapping here so that the index and the mapping live
/// and die together.
#[derive(Debug)]
pub struct IndexEntry<V> {
    /// Base address of the segment.
    pub address: SegmentAddress,
    /// Segment size in bytes.
    pub size: u64,
    /// Attached value.
    pub value: V,
}

/// Bidirectional index of live segments.
///
/// # Invariants
///
/// - Every forward entry has exactly one reverse entry with the same address
/// - Addresses are unique among entries
/// - No operation leaves one direction updated without the other
#[derive(Debug)]
pub struct SegmentIndex<V> {
    forward: BTreeMap<SegmentKey, IndexEntry<V>>,
    reverse: HashMap<SegmentAddress, SegmentKey>,
}

impl<V> Default for SegmentIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SegmentIndex<V> {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            forward: BTreeMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Returns the number of indexed segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns true if no segment is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Looks up a segment by key.
    #[must_use]
    pub fn get(&self, key: &SegmentKey) -> Option<&IndexEntry<V>> {
        self.forward.get(key)
    }

    /// Looks up a segment by address.
    #[must_use]
    pub fn get_by_address(&self, address: SegmentAddress) -> Option<(SegmentKey, &IndexEntry<V>)> {
        let key = *self.reverse.get(&address)?;
        self.forward.get(&key).map(|entry| (key, entry))
    }

    /// Looks up a segment by address for mutation of its value.
    pub fn get_by_address_mut(
        &mut self,
        address: SegmentAddress,
    ) -> Option<(SegmentKey, &mut IndexEntry<V>)> {
        let key = *self.reverse.get(&address)?;
        self.forward.get_mut(&key).map(|entry| (key, entry))
    }

    /// Returns true if the key is indexed.
    #[must_use]
    pub fn contains_key(&self, key: &SegmentKey) -> bool {
        self.forward.contains_key(key)
    }

    /// Returns true if the address is indexed.
    #[must_use]
    pub fn contains_address(&self, address: SegmentAddress) -> bool {
        self.reverse.contains_key(&address)
    }

    /// Registers a segment in both directions.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexConsistency`] if the key or the address is
    /// already registered. Neither map is modified in that case and `value`
    /// is dropped.
    pub fn insert(
        &mut self,
        key: SegmentKey,
        address: SegmentAddress,
        size: u64,
        value: V,
    ) -> CoreResult<()> {
        if let Some(existing) = self.forward.get(&key) {
            return Err(CoreError::index_consistency(format!(
                "{key} already registered at {}",
                existing.address
            )));
        }
        if let Some(owner) = self.reverse.get(&address) {
            return Err(CoreError::index_consistency(format!(
                "address {address} already registered to {owner}"
            )));
        }

        self.forward.insert(
            key,
            IndexEntry {
                address,
                size,
                value,
            },
        );
        self.reverse.insert(address, key);
        Ok(())
    }

    /// Removes a segment by key.
    ///
    /// Returns `Ok(None)` if the key is not indexed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexConsistency`] if the reverse entry is
    /// missing or points elsewhere; nothing is removed in that case.
    pub fn remove(&mut self, key: &SegmentKey) -> CoreResult<Option<(SegmentKey, IndexEntry<V>)>> {
        let Some(entry) = self.forward.get(key) else {
            return Ok(None);
        };
        match self.reverse.get(&entry.address) {
            Some(owner) if owner == key => {}
            other => {
                return Err(CoreError::index_consistency(format!(
                    "{key} maps to {} but reverse entry is {other:?}",
                    entry.address
                )));
            }
        }
        Ok(self.detach(*key))
    }

    /// Removes a segment by address.
    ///
    /// Returns `Ok(None)` if the address is not indexed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexConsistency`] if the forward entry is
    /// missing or records another address; nothing is removed in that case.
    pub fn remove_by_address(
        &mut self,
        address: SegmentAddress,
    ) -> CoreResult<Option<(SegmentKey, IndexEntry<V>)>> {
        let Some(&key) = self.reverse.get(&address) else {
            return Ok(None);
        };
        match self.forward.get(&key) {
            Some(entry) if entry.address == address => {}
            Some(entry) => {
                return Err(CoreError::index_consistency(format!(
                    "address {address} maps to {key} which records {}",
                    entry.address
                )));
            }
            None => {
                return Err(CoreError::index_consistency(format!(
                    "address {address} maps to unregistered {key}"
                )));
            }
        }
        Ok(self.detach(key))
    }

    /// Removes both entries of a key already verified to be consistent.
    fn detach(&mut self, key: SegmentKey) -> Option<(SegmentKey, IndexEntry<V>)> {
        let entry = self.forward.remove(&key)?;
        self.reverse.remove(&entry.address);
        Some((key, entry))
    }

    /// Returns the greatest indexed version of a group.
    #[must_use]
    pub fn max_version(&self, group: GroupId) -> Option<Version> {
        self.group(group).next_back().map(|(key, _)| key.version)
    }

    /// Iterates over the segments of one group in version order.
    pub fn group(
        &self,
        group: GroupId,
    ) -> impl DoubleEndedIterator<Item = (&SegmentKey, &IndexEntry<V>)> {
        let start = SegmentKey::new(group, Version::new(0));
        let end = SegmentKey::new(group, Version::new(u64::MAX));
        self.forward.range(start..=end)
    }

    /// Returns the number of distinct groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        let mut count = 0;
        let mut last = None;
        for key in self.forward.keys() {
            if last != Some(key.group) {
                count += 1;
                last = Some(key.group);
            }
        }
        count
    }

    /// Iterates over all segments in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&SegmentKey, &IndexEntry<V>)> {
        self.forward.iter()
    }

    /// Iterates over all segments as [`SegmentInfo`] snapshots.
    pub fn infos(&self) -> impl Iterator<Item = SegmentInfo> + '_ {
        self.forward.iter().map(|(key, entry)| SegmentInfo {
            key: *key,
            address: entry.address,
            size: entry.size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(group: u64, version: u64) -> SegmentKey {
        SegmentKey::new(GroupId::new(group), Version::new(version))
    }

    fn addr(raw: usize) -> SegmentAddress {
        SegmentAddress::new(raw)
    }

    #[test]
    fn insert_and_lookup_both_ways() {
        let mut index = SegmentIndex::new();
        index.insert(key(1, 1), addr(0x1000), 128, "a").unwrap();

        let entry = index.get(&key(1, 1)).unwrap();
        assert_eq!(entry.address, addr(0x1000));
        assert_eq!(entry.size, 128);

        let (found, entry) = index.get_by_address(addr(0x1000)).unwrap();
        assert_eq!(found, key(1, 1));
        assert_eq!(entry.value, "a");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn duplicate_key_rejected_without_changes() {
        let mut index = SegmentIndex::new();
        index.insert(key(1, 1), addr(0x1000), 128, ()).unwrap();

        let result = index.insert(key(1, 1), addr(0x2000), 64, ());
        assert!(matches!(result, Err(CoreError::IndexConsistency { .. })));
        assert!(!index.contains_address(addr(0x2000)));
        assert_eq!(index.get(&key(1, 1)).unwrap().size, 128);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn duplicate_address_rejected_without_changes() {
        let mut index = SegmentIndex::new();
        index.insert(key(1, 1), addr(0x1000), 128, ()).unwrap();

        let result = index.insert(key(2, 1), addr(0x1000), 64, ());
        assert!(matches!(result, Err(CoreError::IndexConsistency { .. })));
        assert!(!index.contains_key(&key(2, 1)));
        assert_eq!(index.get_by_address(addr(0x1000)).unwrap().0, key(1, 1));
    }

    #[test]
    fn remove_by_key_clears_both_directions() {
        let mut index = SegmentIndex::new();
        index.insert(key(3, 2), addr(0x3000), 16, ()).unwrap();

        let (removed, entry) = index.remove(&key(3, 2)).unwrap().unwrap();
        assert_eq!(removed, key(3, 2));
        assert_eq!(entry.address, addr(0x3000));
        assert!(index.is_empty());
        assert!(!index.contains_address(addr(0x3000)));
    }

    #[test]
    fn remove_by_address_clears_both_directions() {
        let mut index = SegmentIndex::new();
        index.insert(key(3, 2), addr(0x3000), 16, ()).unwrap();
        index.insert(key(3, 3), addr(0x4000), 16, ()).unwrap();

        let (removed, _) = index.remove_by_address(addr(0x3000)).unwrap().unwrap();
        assert_eq!(removed, key(3, 2));
        assert!(!index.contains_key(&key(3, 2)));
        assert!(index.contains_key(&key(3, 3)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn remove_missing_is_none() {
        let mut index: SegmentIndex<()> = SegmentIndex::new();
        assert!(index.remove(&key(1, 1)).unwrap().is_none());
        assert!(index.remove_by_address(addr(0x10)).unwrap().is_none());
    }

    #[test]
    fn diverged_reverse_entry_is_fatal() {
        let mut index = SegmentIndex::new();
        index.insert(key(1, 1), addr(0x1000), 8, ()).unwrap();
        index.reverse.remove(&addr(0x1000));

        let result = index.remove(&key(1, 1));
        assert!(matches!(result, Err(CoreError::IndexConsistency { .. })));
        assert!(index.contains_key(&key(1, 1)));
    }

    #[test]
    fn diverged_forward_entry_is_fatal() {
        let mut index = SegmentIndex::new();
        index.insert(key(1, 1), addr(0x1000), 8, ()).unwrap();
        index.forward.remove(&key(1, 1));

        let result = index.remove_by_address(addr(0x1000));
        assert!(matches!(result, Err(CoreError::IndexConsistency { .. })));
        assert!(index.contains_address(addr(0x1000)));
    }

    #[test]
    fn max_version_is_per_group() {
        let mut index = SegmentIndex::new();
        assert_eq!(index.max_version(GroupId::new(1)), None);

        index.insert(key(1, 2), addr(0x10), 1, ()).unwrap();
        index.insert(key(1, 7), addr(0x20), 1, ()).unwrap();
        index.insert(key(2, 9), addr(0x30), 1, ()).unwrap();
        index.insert(key(0, u64::MAX), addr(0x40), 1, ()).unwrap();

        assert_eq!(index.max_version(GroupId::new(1)), Some(Version::new(7)));
        assert_eq!(index.max_version(GroupId::new(2)), Some(Version::new(9)));
        assert_eq!(index.max_version(GroupId::new(0)), Some(Version::new(u64::MAX)));
        assert_eq!(index.max_version(GroupId::new(3)), None);
        assert_eq!(index.group_count(), 3);
    }

    #[test]
    fn group_iterates_in_version_order() {
        let mut index = SegmentIndex::new();
        index.insert(key(5, 3), addr(0x30), 1, ()).unwrap();
        index.insert(key(5, 1), addr(0x10), 1, ()).unwrap();
        index.insert(key(6, 2), addr(0x20), 1, ()).unwrap();

        let versions: Vec<_> = index
            .group(GroupId::new(5))
            .map(|(k, _)| k.version.as_u64())
            .collect();
        assert_eq!(versions, vec![1, 3]);
    }

    #[test]
    fn infos_snapshot_every_entry() {
        let mut index = SegmentIndex::new();
        index.insert(key(1, 1), addr(0x10), 4, ()).unwrap();
        index.insert(key(2, 1), addr(0x20), 8, ()).unwrap();

        let sizes: Vec<_> = index.infos().map(|info| info.size).collect();
        assert_eq!(sizes, vec![4, 8]);
    }
}
