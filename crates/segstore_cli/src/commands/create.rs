//! Create command implementation.

use segstore_core::{Config, GroupId, SegmentStore};
use std::path::Path;
use tracing::info;

/// Runs the create command.
pub fn run(
    root: &Path,
    config: Config,
    group: u64,
    size: u64,
    fill: Option<u8>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SegmentStore::open(root, config)?;
    let address = store.create(GroupId::new(group), size)?;

    if let Some(byte) = fill {
        if let Some(bytes) = store.segment_mut(address) {
            bytes.fill(byte);
        }
    }

    let info = store
        .info(address)
        .ok_or("created segment missing from index")?;
    info!(key = %info.key, size = info.size, "created segment");
    println!("{}", store.segment_path(info.key).display());

    Ok(())
}
