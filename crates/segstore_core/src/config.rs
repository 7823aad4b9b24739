//! Store configuration.

/// Storage root used when none is given.
pub const DEFAULT_ROOT: &str = "/dev/shm";

/// How the next version of a group is computed.
///
/// The policy is fixed for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionPolicy {
    /// Re-read the group directory on every create.
    ///
    /// Tolerates segments created or removed by other processes, at the
    /// cost of one directory listing per create.
    #[default]
    DiskScan,

    /// Ask the in-memory index for the greatest version of the group.
    ///
    /// Only correct while no other process creates or removes segments in
    /// the same group after this store's recovery scan.
    IndexScan,
}

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the storage root if it doesn't exist.
    pub create_if_missing: bool,

    /// Version allocation policy.
    pub version_policy: VersionPolicy,

    /// Whether to hold an advisory lock on the storage root.
    pub exclusive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            version_policy: VersionPolicy::DiskScan,
            exclusive: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the storage root if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the version allocation policy.
    #[must_use]
    pub const fn version_policy(mut self, policy: VersionPolicy) -> Self {
        self.version_policy = policy;
        self
    }

    /// Sets whether to lock the storage root for exclusive use.
    #[must_use]
    pub const fn exclusive(mut self, value: bool) -> Self {
        self.exclusive = value;
        self
    }
}
