//! Core type definitions for SegStore.

use std::fmt;

/// Identifier for a group of segment versions.
///
/// Each group corresponds to one directory under the storage root, named by
/// the decimal id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub u64);

impl GroupId {
    /// Creates a new group ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for GroupId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group:{}", self.0)
    }
}

/// Version number of a segment within its group.
///
/// Versions start at 1 and strictly increase per group. Zero is reserved to
/// mean "no version" and never names a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pub u64);

impl Version {
    /// The first version issued in an empty group.
    pub const FIRST: Self = Self(1);

    /// Creates a new version.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Returns the raw version value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the version following `max`, where `max == 0` means the
    /// group is empty.
    ///
    /// Returns `None` if the result would wrap around to 0.
    #[must_use]
    pub const fn after(max: u64) -> Option<Self> {
        match max.checked_add(1) {
            Some(next) => Some(Self(next)),
            None => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Key of a segment: its group and version.
///
/// Keys order by group first, then version, so all versions of a group are
/// contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentKey {
    /// The owning group.
    pub group: GroupId,
    /// The version within the group.
    pub version: Version,
}

impl SegmentKey {
    /// Creates a new segment key.
    #[must_use]
    pub const fn new(group: GroupId, version: Version) -> Self {
        Self { group, version }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.version)
    }
}

/// Base address of a mapped segment.
///
/// Addresses are opaque handles: they are unique among live segments of a
/// store and are only meaningful to the store that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentAddress(usize);

impl SegmentAddress {
    /// Creates an address from a raw pointer value.
    #[must_use]
    pub const fn new(address: usize) -> Self {
        Self(address)
    }

    /// Returns the raw pointer value.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for SegmentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Descriptive snapshot of one live segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    /// The segment key.
    pub key: SegmentKey,
    /// Base address of the mapping.
    pub address: SegmentAddress,
    /// Size of the segment in bytes.
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_order_by_group_then_version() {
        let a = SegmentKey::new(GroupId::new(1), Version::new(9));
        let b = SegmentKey::new(GroupId::new(2), Version::new(1));
        let c = SegmentKey::new(GroupId::new(2), Version::new(3));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn version_after() {
        assert_eq!(Version::after(0), Some(Version::FIRST));
        assert_eq!(Version::after(41), Some(Version::new(42)));
        assert_eq!(Version::after(u64::MAX), None);
    }

    #[test]
    fn display_formats() {
        let key = SegmentKey::new(GroupId::new(7), Version::new(3));
        assert_eq!(format!("{key}"), "group:7/v3");
        assert_eq!(format!("{}", SegmentAddress::new(0x1000)), "0x1000");
    }
}
