//! Version allocation.

use crate::config::VersionPolicy;
use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::index::SegmentIndex;
use crate::types::{GroupId, Version};

/// Computes the next version of a group.
///
/// The next version is one past the greatest existing version, or
/// [`Version::FIRST`] for an empty group. Where "existing" is looked up
/// depends on the [`VersionPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct VersionAllocator {
    policy: VersionPolicy,
}

impl VersionAllocator {
    /// Creates an allocator with the given policy.
    #[must_use]
    pub const fn new(policy: VersionPolicy) -> Self {
        Self { policy }
    }

    /// Returns the allocation policy.
    #[must_use]
    pub const fn policy(&self) -> VersionPolicy {
        self.policy
    }

    /// Returns the next version of `group`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::VersionOverflow`] if the group already holds
    /// version `u64::MAX`, or an I/O error if the group directory cannot be
    /// listed under [`VersionPolicy::DiskScan`].
    pub fn next_version<V>(
        &self,
        dir: &StoreDir,
        index: &SegmentIndex<V>,
        group: GroupId,
    ) -> CoreResult<Version> {
        let max = match self.policy {
            VersionPolicy::DiskScan => dir.max_version_on_disk(group)?,
            VersionPolicy::IndexScan => index.max_version(group).map_or(0, Version::as_u64),
        };
        Version::after(max).ok_or(CoreError::VersionOverflow { group })
    }
}
