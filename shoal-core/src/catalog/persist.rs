//! Save and restore of the catalog snapshot
//!
//! The persisted shape is a JSON mapping `id -> [id, title, description,
//! tags, size]`, stored alongside the locally held byte payloads (which live
//! in the bundle store, keyed by the same ids). Restore only yields the
//! entry list; the session decides which entries are backed by held bytes.

use crate::catalog::errors::CatalogResult;
use crate::catalog::record::{FileId, SnapshotEntry};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Write a snapshot mapping to `path` as JSON
pub fn save_snapshot(
    snapshot: &HashMap<FileId, SnapshotEntry>,
    path: impl AsRef<Path>,
) -> CatalogResult<()> {
    let path = path.as_ref();
    let json = serde_json::to_string(snapshot)?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), entries = snapshot.len(), "catalog snapshot saved");
    Ok(())
}

/// Read a snapshot mapping back from `path`
pub fn load_snapshot(path: impl AsRef<Path>) -> CatalogResult<HashMap<FileId, SnapshotEntry>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let snapshot = serde_json::from_str(&json)?;
    Ok(snapshot)
}
