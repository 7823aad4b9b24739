//! Inspect command implementation.
//!
//! Reads the storage root layout only; no segment is opened or mapped.

use segstore_core::{Config, Layout, StoreDir};
use serde::Serialize;
use std::path::Path;

/// Storage root inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Storage root path.
    pub root: String,
    /// Number of group directories.
    pub group_count: usize,
    /// Number of segment files.
    pub segment_count: usize,
    /// Total size of all segment files in bytes.
    pub total_size: u64,
    /// Per-group listing.
    pub groups: Vec<GroupReport>,
    /// Root entries that are not group directories.
    pub foreign: Vec<String>,
}

/// Listing of one group directory.
#[derive(Debug, Serialize)]
pub struct GroupReport {
    /// Group id.
    pub id: u64,
    /// Segments in version order.
    pub segments: Vec<SegmentReport>,
    /// Entries in the group directory that are not segments.
    pub foreign: Vec<String>,
}

/// One segment file.
#[derive(Debug, Serialize)]
pub struct SegmentReport {
    /// Segment version.
    pub version: u64,
    /// File size in bytes.
    pub size: u64,
}

/// Runs the inspect command.
pub fn run(root: &Path, config: &Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let dir = StoreDir::open(root, config)?;
    let result = build_result(root, &dir.scan()?);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print!("{}", render_tree(&result));
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn build_result(root: &Path, layout: &Layout) -> InspectResult {
    InspectResult {
        root: root.display().to_string(),
        group_count: layout.groups.len(),
        segment_count: layout.segment_count(),
        total_size: layout.total_bytes(),
        groups: layout
            .groups
            .iter()
            .map(|group| GroupReport {
                id: group.group.as_u64(),
                segments: group
                    .segments
                    .iter()
                    .map(|segment| SegmentReport {
                        version: segment.version.as_u64(),
                        size: segment.size,
                    })
                    .collect(),
                foreign: group.foreign.iter().map(|p| file_name(p)).collect(),
            })
            .collect(),
        foreign: layout.foreign.iter().map(|p| file_name(p)).collect(),
    }
}

fn render_tree(result: &InspectResult) -> String {
    let mut out = String::new();
    out.push_str(&result.root);
    out.push('\n');

    let entries = result.groups.len() + result.foreign.len();
    let mut position = 0;

    for group in &result.groups {
        position += 1;
        let last = position == entries;
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(&format!("{}/\n", group.id));

        let indent = if last { "    " } else { "│   " };
        let children = group.segments.len() + group.foreign.len();
        let mut child = 0;
        for segment in &group.segments {
            child += 1;
            let branch = if child == children { "└── " } else { "├── " };
            out.push_str(&format!(
                "{indent}{branch}{} ({})\n",
                segment.version,
                format_size(segment.size)
            ));
        }
        for name in &group.foreign {
            child += 1;
            let branch = if child == children { "└── " } else { "├── " };
            out.push_str(&format!("{indent}{branch}{name} [foreign]\n"));
        }
    }

    for name in &result.foreign {
        position += 1;
        let branch = if position == entries { "└── " } else { "├── " };
        out.push_str(&format!("{branch}{name} [foreign]\n"));
    }

    out.push('\n');
    out.push_str(&format!(
        "{} groups, {} segments, {}\n",
        result.group_count,
        result.segment_count,
        format_size(result.total_size)
    ));
    out
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
