//! Delete command implementation.

use segstore_core::{Config, GroupId, SegmentKey, SegmentStore, Version};
use std::path::Path;
use tracing::info;

/// Runs the delete command.
pub fn run(
    root: &Path,
    config: Config,
    group: u64,
    version: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SegmentStore::open(root, config)?;
    let key = SegmentKey::new(GroupId::new(group), Version::new(version));

    let segment = store
        .lookup(key)
        .ok_or_else(|| format!("No segment {key} under {}", root.display()))?;
    store.delete(segment.address)?;

    info!(%key, size = segment.size, "deleted segment");
    Ok(())
}
