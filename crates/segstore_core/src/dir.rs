//! Storage root management.
//!
//! This module handles the file system layout of a store:
//!
//! ```text
//! <root>/
//! ├─ 1/                # group 1
//! │  ├─ 2              # segment version 2, length == segment size
//! │  └─ 3
//! ├─ 42/
//! │  └─ 1
//! └─ LOCK              # advisory lock, only in exclusive mode
//! ```
//!
//! Group directories and segment files are named by canonical decimal
//! numbers. Every other entry, at either level, is foreign: it is listed by
//! [`StoreDir::scan`] but never touched.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::types::{GroupId, SegmentKey, Version};
use fs2::FileExt;
use std::ffi::OsStr;
use std::fs::{self, File, Metadata, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lock file name within the storage root.
const LOCK_FILE: &str = "LOCK";

/// Parses a directory entry name as a canonical decimal `u64`.
///
/// Only plain ASCII digits without a sign or leading zeros are accepted, so
/// that a parsed id always formats back to the same name.
#[must_use]
pub fn parse_id(name: &OsStr) -> Option<u64> {
    let name = name.to_str()?;
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if name.len() > 1 && name.starts_with('0') {
        return None;
    }
    name.parse().ok()
}

/// Returns true if `name` is all ASCII digits but not canonical, such as
/// `007`, or too large for a `u64`.
///
/// Such entries are foreign like any other, but look like ids to an
/// operator.
#[must_use]
pub fn is_noncanonical_number(name: &OsStr) -> bool {
    match name.to_str() {
        Some(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            parse_id(name).is_none()
        }
        _ => false,
    }
}

/// The storage root of a store.
///
/// In exclusive mode the `StoreDir` holds an advisory lock on
/// `<root>/LOCK` until it is dropped.
#[derive(Debug)]
pub struct StoreDir {
    /// Root directory path.
    path: PathBuf,
    /// Lock file handle, held in exclusive mode.
    _lock_file: Option<File>,
}

impl StoreDir {
    /// Opens the storage root, creating it if configured to.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] if the root is missing (and
    /// `create_if_missing` is off), not a directory, or unreadable, and
    /// [`CoreError::StoreLocked`] if another exclusive store holds the lock.
    pub fn open(path: &Path, config: &Config) -> CoreResult<Self> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(CoreError::configuration(format!(
                    "storage root is not a directory: {}",
                    path.display()
                )));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if !config.create_if_missing {
                    return Err(CoreError::configuration(format!(
                        "storage root does not exist: {}",
                        path.display()
                    )));
                }
                fs::create_dir_all(path).map_err(|e| {
                    CoreError::configuration(format!(
                        "cannot create storage root {}: {e}",
                        path.display()
                    ))
                })?;
            }
            Err(e) => {
                return Err(CoreError::configuration(format!(
                    "cannot access storage root {}: {e}",
                    path.display()
                )));
            }
        }

        fs::read_dir(path).map_err(|e| {
            CoreError::configuration(format!(
                "cannot read storage root {}: {e}",
                path.display()
            ))
        })?;

        let lock_file = if config.exclusive {
            Some(Self::lock(path)?)
        } else {
            None
        };

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    fn lock(root: &Path) -> CoreResult<File> {
        let lock_path = root.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| CoreError::io("open", &lock_path, e))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::StoreLocked {
                path: root.to_path_buf(),
            });
        }
        Ok(lock_file)
    }

    /// Returns the path to the storage root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the directory of a group.
    #[must_use]
    pub fn group_path(&self, group: GroupId) -> PathBuf {
        self.path.join(group.as_u64().to_string())
    }

    /// Returns the backing file of a segment.
    #[must_use]
    pub fn segment_path(&self, key: SegmentKey) -> PathBuf {
        self.group_path(key.group).join(key.version.as_u64().to_string())
    }

    /// Creates the group directory if it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than "already exists".
    pub fn ensure_group(&self, group: GroupId) -> CoreResult<PathBuf> {
        let group_path = self.group_path(group);
        match fs::create_dir(&group_path) {
            Ok(()) => {
                debug!(%group, path = %group_path.display(), "created group directory");
                Ok(group_path)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(group_path),
            Err(e) => Err(CoreError::io("create directory", group_path, e)),
        }
    }

    /// Removes the group directory if it is empty.
    ///
    /// Failures ("not empty", "not found", or anything else) are ignored.
    /// Returns true if the directory was removed.
    pub fn remove_group_if_empty(&self, group: GroupId) -> bool {
        let group_path = self.group_path(group);
        match fs::remove_dir(&group_path) {
            Ok(()) => {
                debug!(%group, "removed empty group directory");
                true
            }
            Err(e) => {
                debug!(%group, error = %e, "kept group directory");
                false
            }
        }
    }

    /// Returns the greatest version found in the group directory, or 0 if
    /// the directory is missing or holds no segment names.
    ///
    /// Entry names are parsed only; files are not opened or inspected.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub fn max_version_on_disk(&self, group: GroupId) -> CoreResult<u64> {
        let group_path = self.group_path(group);
        let entries = match fs::read_dir(&group_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CoreError::io("list", group_path, e)),
        };

        let mut max = 0;
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::io("list", &group_path, e))?;
            if let Some(version) = parse_id(&entry.file_name()) {
                max = max.max(version);
            }
        }
        Ok(max)
    }

    /// Lists the storage root without opening or mapping any segment.
    ///
    /// Groups and versions are returned in ascending order. A missing root
    /// scans as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be listed or an entry cannot
    /// be inspected.
    pub fn scan(&self) -> CoreResult<Layout> {
        let mut layout = Layout::default();

        for entry in list(&self.path)? {
            match entry {
                Entry::Numeric(id, path, meta) if meta.is_dir() => {
                    layout.groups.push(scan_group(GroupId::new(id), path)?);
                }
                Entry::Numeric(_, path, _) | Entry::Foreign(path) => layout.foreign.push(path),
            }
        }

        layout.groups.sort_by_key(|g| g.group);
        layout.foreign.sort();
        Ok(layout)
    }
}

fn scan_group(group: GroupId, path: PathBuf) -> CoreResult<GroupLayout> {
    let mut segments = Vec::new();
    let mut foreign = Vec::new();

    for entry in list(&path)? {
        match entry {
            Entry::Numeric(id, path, meta) if id != 0 && meta.is_file() => {
                segments.push(SegmentLayout {
                    version: Version::new(id),
                    path,
                    size: meta.len(),
                });
            }
            Entry::Numeric(_, path, _) | Entry::Foreign(path) => foreign.push(path),
        }
    }

    segments.sort_by_key(|s| s.version);
    foreign.sort();
    Ok(GroupLayout {
        group,
        path,
        segments,
        foreign,
    })
}

enum Entry {
    Numeric(u64, PathBuf, Metadata),
    Foreign(PathBuf),
}

fn list(dir: &Path) -> CoreResult<Vec<Entry>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CoreError::io("list", dir, e)),
    };

    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io("list", dir, e))?;
        let path = entry.path();
        match parse_id(&entry.file_name()) {
            Some(id) => {
                let meta = fs::metadata(&path).map_err(|e| CoreError::io("stat", &path, e))?;
                out.push(Entry::Numeric(id, path, meta));
            }
            None => out.push(Entry::Foreign(path)),
        }
    }
    Ok(out)
}

/// On-disk contents of a storage root.
#[derive(Debug, Default)]
pub struct Layout {
    /// Group directories, ascending by id.
    pub groups: Vec<GroupLayout>,
    /// Root entries that are not group directories.
    pub foreign: Vec<PathBuf>,
}

impl Layout {
    /// Returns the number of segment files across all groups.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.groups.iter().map(|g| g.segments.len()).sum()
    }

    /// Returns the total size of all segment files in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.groups
            .iter()
            .flat_map(|g| &g.segments)
            .map(|s| s.size)
            .sum()
    }

    /// Returns the number of foreign entries at both levels.
    #[must_use]
    pub fn foreign_count(&self) -> usize {
        self.foreign.len() + self.groups.iter().map(|g| g.foreign.len()).sum::<usize>()
    }
}

/// One group directory.
#[derive(Debug)]
pub struct GroupLayout {
    /// The group id.
    pub group: GroupId,
    /// The group directory.
    pub path: PathBuf,
    /// Segment files, ascending by version.
    pub segments: Vec<SegmentLayout>,
    /// Entries in the group directory that are not segment files.
    pub foreign: Vec<PathBuf>,
}

/// One segment file.
#[derive(Debug)]
pub struct SegmentLayout {
    /// The segment version.
    pub version: Version,
    /// The backing file.
    pub path: PathBuf,
    /// File length in bytes.
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn open(path: &Path) -> StoreDir {
        StoreDir::open(path, &Config::default()).unwrap()
    }

    #[test]
    fn parse_id_accepts_canonical_decimal() {
        assert_eq!(parse_id(OsStr::new("0")), Some(0));
        assert_eq!(parse_id(OsStr::new("17")), Some(17));
        assert_eq!(parse_id(OsStr::new("18446744073709551615")), Some(u64::MAX));
    }

    #[test]
    fn parse_id_rejects_everything_else() {
        for name in ["", "LOCK", "12abc", "+3", "-1", " 4", "007", "1.5", "18446744073709551616"] {
            assert_eq!(parse_id(OsStr::new(name)), None, "{name:?}");
        }
    }

    #[test]
    fn noncanonical_numbers_are_flagged() {
        for name in ["007", "00", "18446744073709551616"] {
            assert!(is_noncanonical_number(OsStr::new(name)), "{name:?}");
        }
        for name in ["0", "7", "", "LOCK", "-1", "1.5"] {
            assert!(!is_noncanonical_number(OsStr::new(name)), "{name:?}");
        }
    }

    proptest! {
        #[test]
        fn parse_id_round_trips_decimal(id in any::<u64>()) {
            let name = id.to_string();
            prop_assert_eq!(parse_id(OsStr::new(&name)), Some(id));
            prop_assert!(!is_noncanonical_number(OsStr::new(&name)));
        }

        #[test]
        fn parse_id_rejects_leading_zeros(id in any::<u64>(), zeros in 1usize..4) {
            let name = format!("{}{id}", "0".repeat(zeros));
            prop_assert_eq!(parse_id(OsStr::new(&name)), None);
            prop_assert!(is_noncanonical_number(OsStr::new(&name)));
        }
    }

    #[test]
    fn open_creates_root() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("shm");

        let dir = open(&root);
        assert!(root.is_dir());
        assert_eq!(dir.path(), root);
    }

    #[test]
    fn open_fails_if_missing_and_no_create() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("missing");

        let result = StoreDir::open(&root, &Config::new().create_if_missing(false));
        assert!(matches!(result, Err(CoreError::Configuration { .. })));
    }

    #[test]
    fn open_fails_on_file_root() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("file");
        fs::write(&root, b"x").unwrap();

        let result = StoreDir::open(&root, &Config::default());
        assert!(matches!(result, Err(CoreError::Configuration { .. })));
    }

    #[test]
    fn exclusive_lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let config = Config::new().exclusive(true);

        let _first = StoreDir::open(temp.path(), &config).unwrap();
        let second = StoreDir::open(temp.path(), &config);
        assert!(matches!(second, Err(CoreError::StoreLocked { .. })));
    }

    #[test]
    fn exclusive_lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let config = Config::new().exclusive(true);

        {
            let _dir = StoreDir::open(temp.path(), &config).unwrap();
        }
        let _again = StoreDir::open(temp.path(), &config).unwrap();
    }

    #[test]
    fn paths_are_correct() {
        let temp = tempdir().unwrap();
        let dir = open(temp.path());
        let key = SegmentKey::new(GroupId::new(12), Version::new(3));

        assert_eq!(dir.group_path(GroupId::new(12)), temp.path().join("12"));
        assert_eq!(dir.segment_path(key), temp.path().join("12").join("3"));
    }

    #[test]
    fn ensure_group_tolerates_existing() {
        let temp = tempdir().unwrap();
        let dir = open(temp.path());

        let first = dir.ensure_group(GroupId::new(5)).unwrap();
        let second = dir.ensure_group(GroupId::new(5)).unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn remove_group_only_when_empty() {
        let temp = tempdir().unwrap();
        let dir = open(temp.path());
        let group = GroupId::new(1);

        let group_path = dir.ensure_group(group).unwrap();
        fs::write(group_path.join("1"), b"x").unwrap();
        assert!(!dir.remove_group_if_empty(group));
        assert!(group_path.exists());

        fs::remove_file(group_path.join("1")).unwrap();
        assert!(dir.remove_group_if_empty(group));
        assert!(!group_path.exists());

        // Already gone: ignored.
        assert!(!dir.remove_group_if_empty(group));
    }

    #[test]
    fn max_version_on_disk_ignores_foreign_names() {
        let temp = tempdir().unwrap();
        let dir = open(temp.path());
        let group = GroupId::new(9);

        assert_eq!(dir.max_version_on_disk(group).unwrap(), 0);

        let group_path = dir.ensure_group(group).unwrap();
        assert_eq!(dir.max_version_on_disk(group).unwrap(), 0);

        for name in ["2", "10", "notes.txt", "011"] {
            fs::write(group_path.join(name), b"").unwrap();
        }
        assert_eq!(dir.max_version_on_disk(group).unwrap(), 10);
    }

    #[test]
    fn scan_classifies_entries() {
        let temp = tempdir().unwrap();
        let dir = open(temp.path());

        let g1 = dir.ensure_group(GroupId::new(1)).unwrap();
        fs::write(g1.join("2"), [0u8; 16]).unwrap();
        fs::write(g1.join("1"), [0u8; 8]).unwrap();
        fs::write(g1.join("0"), b"").unwrap();
        fs::write(g1.join("scratch"), b"").unwrap();
        fs::create_dir(temp.path().join("cache")).unwrap();
        fs::write(temp.path().join("3"), b"not a group").unwrap();

        let layout = dir.scan().unwrap();
        assert_eq!(layout.groups.len(), 1);

        let group = &layout.groups[0];
        assert_eq!(group.group, GroupId::new(1));
        let versions: Vec<_> = group.segments.iter().map(|s| s.version.as_u64()).collect();
        assert_eq!(versions, vec![1, 2]);
        assert_eq!(group.foreign.len(), 2);

        assert_eq!(layout.segment_count(), 2);
        assert_eq!(layout.total_bytes(), 24);
        assert_eq!(layout.foreign_count(), 4);
    }
}
