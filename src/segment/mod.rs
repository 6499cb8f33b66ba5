//! Segment Module
//!
//! Append-only segment files holding the record log.
//!
//! ## Responsibilities
//! - Append encoded records and sync them to disk
//! - Positional reads for the get path
//! - Sequential replay for crash recovery, truncating torn tails
//! - Segment naming and directory discovery
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── 1.data     (oldest)
//!   ├── 2.data
//!   └── N.data     (active, writable)
//! ```

mod file;
mod replay;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub use file::SegmentFile;
pub use replay::SegmentReplay;

/// File extension of segment files
pub const SEGMENT_EXTENSION: &str = "data";

/// Generate the path of segment `id` inside `dir`
/// (dir, 42) → "{dir}/42.data"
pub fn segment_path(dir: &Path, id: u32) -> PathBuf {
    dir.join(format!("{}.{}", id, SEGMENT_EXTENSION))
}

/// Discover segment ids in `dir`, sorted ascending
///
/// Files that are not `<number>.data` are ignored.
pub fn list_segment_ids(dir: &Path) -> Result<Vec<u32>> {
    let mut ids = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(id) = parse_segment_id(&path) {
                ids.push(id);
            }
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

/// "42.data" → Some(42)
fn parse_segment_id(path: &Path) -> Option<u32> {
    if path.extension()? != SEGMENT_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}
