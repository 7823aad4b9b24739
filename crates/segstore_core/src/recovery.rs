//! Startup recovery.
//!
//! Rebuilds the segment index from the storage root. Every segment file
//! found on disk is re-opened, mapped read/write with shared semantics, and
//! registered under its `(group, version)` key. Foreign entries are skipped;
//! any failure on a real segment aborts recovery.
//!
//! Directory traversal order is not relied upon: the only requirement is
//! that after the scan the index holds exactly the segments on disk.

use crate::dir::{is_noncanonical_number, StoreDir};
use crate::error::CoreResult;
use crate::index::SegmentIndex;
use crate::types::{SegmentAddress, SegmentKey};
use segstore_storage::{MappedRegion, SegmentFile};
use std::path::Path;
use tracing::{debug, info, warn};

/// Summary of a recovery scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Number of group directories found.
    pub groups: usize,
    /// Number of segments re-mapped.
    pub segments: usize,
    /// Total bytes re-mapped.
    pub mapped_bytes: u64,
    /// Number of foreign entries skipped.
    pub foreign_entries: usize,
}

/// Scans `dir` and returns an index of every segment on disk.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed, or if any discovered
/// segment cannot be opened, sized, mapped, or registered. No partial index
/// is returned; mappings made before the failure are released.
pub fn recover(dir: &StoreDir) -> CoreResult<(SegmentIndex<MappedRegion>, RecoveryReport)> {
    let layout = dir.scan()?;
    let mut index = SegmentIndex::new();
    let mut report = RecoveryReport {
        groups: layout.groups.len(),
        foreign_entries: layout.foreign_count(),
        ..RecoveryReport::default()
    };

    for path in &layout.foreign {
        warn_foreign(path, "storage root");
    }

    for group in &layout.groups {
        for path in &group.foreign {
            warn_foreign(path, "group directory");
        }

        for segment in &group.segments {
            let key = SegmentKey::new(group.group, segment.version);
            let file = SegmentFile::open(&segment.path)?;
            let region = MappedRegion::map(&file)?;
            drop(file);

            let address = SegmentAddress::new(region.base_address());
            let size = region.len() as u64;
            debug!(%key, %address, size, "recovered segment");

            index.insert(key, address, size, region)?;
            report.segments += 1;
            report.mapped_bytes += size;
        }
    }

    info!(
        root = %dir.path().display(),
        groups = report.groups,
        segments = report.segments,
        mapped_bytes = report.mapped_bytes,
        foreign = report.foreign_entries,
        "recovery complete"
    );
    Ok((index, report))
}

fn warn_foreign(path: &Path, location: &str) {
    let noncanonical = path.file_name().is_some_and(is_noncanonical_number);
    if noncanonical {
        warn!(
            path = %path.display(),
            location,
            "skipping numeric but non-canonical name; ids are plain decimal without leading zeros"
        );
    } else {
        warn!(path = %path.display(), location, "skipping foreign entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::{CoreError, ErrorKind};
    use crate::types::{GroupId, Version};
    use std::fs;
    use tempfile::tempdir;

    fn open(root: &Path) -> StoreDir {
        StoreDir::open(root, &Config::default()).unwrap()
    }

    fn key(group: u64, version: u64) -> SegmentKey {
        SegmentKey::new(GroupId::new(group), Version::new(version))
    }

    #[test]
    fn empty_root_recovers_empty_index() {
        let temp = tempdir().unwrap();
        let (index, report) = recover(&open(temp.path())).unwrap();

        assert!(index.is_empty());
        assert_eq!(report, RecoveryReport::default());
    }

    #[test]
    fn missing_root_is_created_and_empty() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("fresh");

        let (index, report) = recover(&open(&root)).unwrap();
        assert!(index.is_empty());
        assert_eq!(report.groups, 0);
    }

    #[test]
    fn discovers_segments_with_contents() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("1")).unwrap();
        fs::create_dir_all(root.join("7")).unwrap();
        fs::write(root.join("1").join("2"), vec![b'x'; 64]).unwrap();
        fs::write(root.join("1").join("3"), vec![b'y'; 32]).unwrap();
        fs::write(root.join("7").join("1"), vec![b'z'; 100]).unwrap();

        let (index, report) = recover(&open(root)).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(report.groups, 2);
        assert_eq!(report.segments, 3);
        assert_eq!(report.mapped_bytes, 196);

        let entry = index.get(&key(1, 3)).unwrap();
        assert_eq!(entry.size, 32);
        assert!(entry.value.as_slice().iter().all(|&b| b == b'y'));
        assert_eq!(
            index.get_by_address(entry.address).unwrap().0,
            key(1, 3)
        );

        assert_eq!(index.max_version(GroupId::new(1)), Some(Version::new(3)));
        assert_eq!(index.max_version(GroupId::new(7)), Some(Version::new(1)));
    }

    #[test]
    fn foreign_entries_are_skipped() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("2")).unwrap();
        fs::write(root.join("2").join("1"), [1u8; 8]).unwrap();
        fs::write(root.join("2").join("notes"), b"").unwrap();
        fs::write(root.join("2").join("0"), b"").unwrap();
        fs::create_dir_all(root.join("tmp")).unwrap();
        fs::write(root.join("sem.lock"), b"").unwrap();
        fs::write(root.join("5"), b"file, not a group").unwrap();

        let (index, report) = recover(&open(root)).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.contains_key(&key(2, 1)));
        assert_eq!(report.foreign_entries, 5);
    }

    #[test]
    fn leading_zero_names_are_not_segments() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("1")).unwrap();
        fs::write(root.join("1").join("007"), [7u8; 8]).unwrap();
        fs::create_dir_all(root.join("02")).unwrap();

        let dir = open(root);
        let (index, report) = recover(&dir).unwrap();
        assert!(index.is_empty());
        assert_eq!(report.groups, 1);
        assert_eq!(report.foreign_entries, 2);

        // The skipped file is left alone and does not count as a version.
        assert_eq!(dir.max_version_on_disk(GroupId::new(1)).unwrap(), 0);
        assert_eq!(fs::read(root.join("1").join("007")).unwrap(), vec![7u8; 8]);
    }

    #[test]
    fn recovered_mappings_are_shared() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("3")).unwrap();
        let path = root.join("3").join("1");
        fs::write(&path, [0u8; 16]).unwrap();

        let (mut index, _) = recover(&open(root)).unwrap();
        let address = index.get(&key(3, 1)).unwrap().address;
        let (_, entry) = index.get_by_address_mut(address).unwrap();
        entry.value.as_mut_slice().copy_from_slice(&[9u8; 16]);
        drop(index);

        assert_eq!(fs::read(&path).unwrap(), vec![9u8; 16]);
    }

    #[test]
    fn empty_segment_file_fails_recovery() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("1")).unwrap();
        fs::write(root.join("1").join("1"), [0u8; 4]).unwrap();
        fs::write(root.join("1").join("2"), b"").unwrap();

        let result = recover(&open(root));
        let err = result.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Mapping);
    }

    #[test]
    fn numeric_directory_inside_group_is_foreign() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("1").join("4")).unwrap();

        let (index, report) = recover(&open(root)).unwrap();
        assert!(index.is_empty());
        assert_eq!(report.groups, 1);
        assert_eq!(report.foreign_entries, 1);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_segment_fails_recovery() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("1")).unwrap();
        let path = root.join("1").join("1");
        fs::write(&path, [0u8; 4]).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users bypass permission bits.
        if fs::OpenOptions::new().read(true).write(true).open(&path).is_ok() {
            return;
        }

        let result = recover(&open(root));
        assert!(matches!(result, Err(CoreError::Storage(_))));
    }
}
