//! Resource marker detection.
//!
//! A directory that directly contains either marker file is one resource
//! unit.  The markers are checked independently; a directory carrying both is
//! classified by the current one.
use std::path::Path;

use super::helpers::fs::contains_file;
use crate::config::Markers;

/// Which marker qualified a directory as a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Current manifest format.
    Current,
    /// Legacy manifest format only; the resource is flagged as outdated.
    Legacy,
}

/// Classify `dir` by its marker files, or `None` if it is not a resource.
#[must_use]
pub fn detect(dir: &Path, markers: &Markers) -> Option<MarkerKind> {
    if contains_file(dir, &markers.current) {
        Some(MarkerKind::Current)
    } else if contains_file(dir, &markers.legacy) {
        Some(MarkerKind::Legacy)
    } else {
        None
    }
}
