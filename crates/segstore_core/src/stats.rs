//! Store statistics.

/// Point-in-time statistics of a store.
///
/// ```rust,ignore
/// let stats = store.stats();
/// println!("{} segments in {} groups", stats.segments, stats.groups);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of groups with at least one live segment.
    pub groups: usize,
    /// Number of live segments.
    pub segments: usize,
    /// Total bytes currently mapped.
    pub mapped_bytes: u64,
    /// Segments recovered from disk when the store was opened.
    pub recovered: usize,
    /// Segments created since the store was opened.
    pub created: u64,
    /// Segments deleted since the store was opened.
    pub deleted: u64,
    /// Create or delete calls that failed.
    pub errors: u64,
}

/// Operation counters kept by the store.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) created: u64,
    pub(crate) deleted: u64,
    pub(crate) errors: u64,
}

impl Counters {
    /// Counts the outcome of a mutating operation.
    pub(crate) fn record<T, E>(&mut self, result: &Result<T, E>, on_success: fn(&mut Self)) {
        match result {
            Ok(_) => on_success(self),
            Err(_) => self.errors += 1,
        }
    }
}
