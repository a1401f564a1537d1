//! Shared fixtures

use crate::catalog::{FileId, FileRecord, SnapshotEntry};

/// A metadata entry with predictable fields
pub fn sample_entry(id: &str, size: u64) -> SnapshotEntry {
    SnapshotEntry(
        FileId::new(id),
        format!("title-{id}"),
        format!("description-{id}"),
        "sample".to_string(),
        size,
    )
}

/// A record holding all of its bytes, as a locally produced file would
pub fn sample_local_record(id: &str, size: u64) -> FileRecord {
    FileRecord::local(
        FileId::new(id),
        format!("title-{id}"),
        format!("description-{id}"),
        "sample",
        size,
    )
}

/// A record learned from a remote peer, with nothing acquired
pub fn sample_remote_record(id: &str, size: u64) -> FileRecord {
    FileRecord::remote(&sample_entry(id, size))
}
