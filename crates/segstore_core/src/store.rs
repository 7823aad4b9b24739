//! The segment store.
//!
//! [`SegmentStore`] ties the storage root, the bidirectional index, and the
//! version allocator together. Opening a store runs the recovery scan; after
//! that, [`SegmentStore::create`] and [`SegmentStore::delete`] keep disk and
//! index in step.

use crate::allocator::VersionAllocator;
use crate::config::{Config, VersionPolicy};
use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::index::SegmentIndex;
use crate::recovery::{recover, RecoveryReport};
use crate::stats::{Counters, StoreStats};
use crate::types::{GroupId, SegmentAddress, SegmentInfo, SegmentKey};
use segstore_storage::{MappedRegion, SegmentFile, StorageError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A persistent, versioned store of shared-memory segments.
///
/// # Thread Safety
///
/// The store has no internal locking. Mutating operations take `&mut self`;
/// sharing a store between threads requires external synchronization.
///
/// # Example
///
/// ```rust,ignore
/// use segstore_core::{Config, GroupId, SegmentStore};
///
/// let mut store = SegmentStore::open("/dev/shm", Config::default())?;
/// let address = store.create(GroupId::new(1), 128)?;
/// store.segment_mut(address).unwrap().fill(b'f');
/// store.delete(address)?;
/// ```
#[derive(Debug)]
pub struct SegmentStore {
    dir: StoreDir,
    index: SegmentIndex<MappedRegion>,
    allocator: VersionAllocator,
    recovery: RecoveryReport,
    counters: Counters,
}

impl SegmentStore {
    /// Opens a store rooted at `root` and recovers every segment on disk.
    ///
    /// Recovery runs exactly once per store value, before any create or
    /// delete is possible.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the root is unusable, or any error
    /// raised while re-mapping a discovered segment.
    pub fn open(root: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        let dir = StoreDir::open(root.as_ref(), &config)?;
        let (index, recovery) = recover(&dir)?;

        Ok(Self {
            dir,
            index,
            allocator: VersionAllocator::new(config.version_policy),
            recovery,
            counters: Counters::default(),
        })
    }

    /// Creates a segment of `size` bytes in `group` and maps it.
    ///
    /// The segment receives the next version of the group. Its bytes start
    /// zeroed and are reachable through [`SegmentStore::segment_mut`].
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidSize`] if `size` is zero or not addressable
    /// - [`CoreError::VersionOverflow`] if the group's versions are exhausted
    /// - [`CoreError::Collision`] if the allocated version already has a file
    /// - I/O, mapping, or index errors from the individual steps
    ///
    /// On error nothing is registered and no segment file is left behind.
    pub fn create(&mut self, group: GroupId, size: u64) -> CoreResult<SegmentAddress> {
        let result = self.create_segment(group, size);
        self.counters.record(&result, |c| c.created += 1);
        result
    }

    fn create_segment(&mut self, group: GroupId, size: u64) -> CoreResult<SegmentAddress> {
        if size == 0 || usize::try_from(size).is_err() {
            return Err(CoreError::InvalidSize { size });
        }

        let group_path = self.dir.ensure_group(group)?;
        let version = self.allocator.next_version(&self.dir, &self.index, group)?;
        let key = SegmentKey::new(group, version);
        let path = self.dir.segment_path(key);

        let file = SegmentFile::create_new(&path).map_err(|e| match e {
            StorageError::AlreadyExists { path } => CoreError::Collision { key, path },
            other => other.into(),
        })?;
        let pending = PendingSegment::new(&path, &group_path);

        file.set_len(size)?;
        let region = MappedRegion::map(&file)?;
        drop(file);

        let address = SegmentAddress::new(region.base_address());
        self.index.insert(key, address, size, region)?;
        pending.commit();

        debug!(%key, %address, size, "created segment");
        Ok(address)
    }

    /// Deletes the segment mapped at `address`.
    ///
    /// The mapping is released, the backing file removed, and the group
    /// directory removed if it is now empty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if `address` is not a live segment of
    /// this store, including a second delete of the same address. Other
    /// errors leave the segment unregistered but possibly still on disk.
    pub fn delete(&mut self, address: SegmentAddress) -> CoreResult<()> {
        let result = self.delete_segment(address);
        self.counters.record(&result, |c| c.deleted += 1);
        result
    }

    fn delete_segment(&mut self, address: SegmentAddress) -> CoreResult<()> {
        let (key, entry) = self
            .index
            .remove_by_address(address)?
            .ok_or(CoreError::NotFound { address })?;
        entry.value.unmap();

        let path = self.dir.segment_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(%key, path = %path.display(), "segment file already removed");
            }
            Err(e) => return Err(CoreError::io("remove", path, e)),
        }
        self.dir.remove_group_if_empty(key.group);

        debug!(%key, %address, size = entry.size, "deleted segment");
        Ok(())
    }

    /// Looks up a live segment by key.
    #[must_use]
    pub fn lookup(&self, key: SegmentKey) -> Option<SegmentInfo> {
        self.index.get(&key).map(|entry| SegmentInfo {
            key,
            address: entry.address,
            size: entry.size,
        })
    }

    /// Looks up a live segment by address.
    #[must_use]
    pub fn info(&self, address: SegmentAddress) -> Option<SegmentInfo> {
        self.index
            .get_by_address(address)
            .map(|(key, entry)| SegmentInfo {
                key,
                address,
                size: entry.size,
            })
    }

    /// Returns the newest live segment of a group.
    #[must_use]
    pub fn latest(&self, group: GroupId) -> Option<SegmentInfo> {
        let version = self.index.max_version(group)?;
        self.lookup(SegmentKey::new(group, version))
    }

    /// Returns true if `address` is a live segment of this store.
    #[must_use]
    pub fn contains(&self, address: SegmentAddress) -> bool {
        self.index.contains_address(address)
    }

    /// Returns the bytes of the segment at `address`.
    #[must_use]
    pub fn segment(&self, address: SegmentAddress) -> Option<&[u8]> {
        self.index
            .get_by_address(address)
            .map(|(_, entry)| entry.value.as_slice())
    }

    /// Returns the bytes of the segment at `address` for writing.
    ///
    /// Writes go straight to the shared mapping and reach the backing file.
    pub fn segment_mut(&mut self, address: SegmentAddress) -> Option<&mut [u8]> {
        self.index
            .get_by_address_mut(address)
            .map(|(_, entry)| entry.value.as_mut_slice())
    }

    /// Iterates over all live segments in key order.
    pub fn segments(&self) -> impl Iterator<Item = SegmentInfo> + '_ {
        self.index.infos()
    }

    /// Returns the number of live segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the store holds no live segment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the backing file path of a segment key.
    #[must_use]
    pub fn segment_path(&self, key: SegmentKey) -> PathBuf {
        self.dir.segment_path(key)
    }

    /// Returns the version allocation policy.
    #[must_use]
    pub fn version_policy(&self) -> VersionPolicy {
        self.allocator.policy()
    }

    /// Returns the result of the recovery scan run at open.
    #[must_use]
    pub fn recovery_report(&self) -> RecoveryReport {
        self.recovery
    }

    /// Returns current statistics.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            groups: self.index.group_count(),
            segments: self.index.len(),
            mapped_bytes: self.index.iter().map(|(_, entry)| entry.size).sum(),
            recovered: self.recovery.segments,
            created: self.counters.created,
            deleted: self.counters.deleted,
            errors: self.counters.errors,
        }
    }
}

/// Removes a half-created segment file unless committed.
///
/// Armed right after the exclusive create succeeds, so every later failure
/// in `create` cleans up the file and, if it is now empty, the group
/// directory.
struct PendingSegment<'a> {
    file: &'a Path,
    group: &'a Path,
    armed: bool,
}

impl<'a> PendingSegment<'a> {
    fn new(file: &'a Path, group: &'a Path) -> Self {
        Self {
            file,
            group,
            armed: true,
        }
    }

    fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingSegment<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = fs::remove_file(self.file) {
            warn!(path = %self.file.display(), error = %e, "failed to remove partial segment");
        }
        let _ = fs::remove_dir(self.group);
    }
}
