/*
    record.rs - File entry model

    Defines:
    - FileId, the content-derived stable identifier
    - FileStatus / FileRecord, an entry's metadata and acquisition state
    - SnapshotEntry, the wire/persistence shape of an entry
*/

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Content-derived stable identifier for a shared file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        FileId(id.into())
    }

    /// Derive an id from file contents
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        FileId(hex::encode(digest))
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Acquisition state of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    /// Known but no bytes acquired yet
    Pending,
    /// A transfer is moving bytes for this entry
    Downloading,
    /// All bytes acquired and installed into the bundle store
    Installed,
    /// The last transfer or install attempt failed
    Failed,
}

impl Default for FileStatus {
    fn default() -> Self {
        FileStatus::Pending
    }
}

/// A single catalog entry: metadata plus local acquisition state
///
/// Invariants:
/// - `status == Installed` implies `acquired_bytes == total_size` and `installed`
/// - `acquired_bytes` only grows while `Downloading`
/// - `mark_failed` resets `acquired_bytes` to 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub title: String,
    pub description: String,
    pub tags: String,
    /// Total size in bytes, immutable after creation
    pub total_size: u64,
    /// Bytes acquired so far, 0..=total_size
    pub acquired_bytes: u64,
    pub status: FileStatus,
    pub installed: bool,
}

impl FileRecord {
    /// Entry for a locally produced file: all bytes are already held
    pub fn local(
        id: FileId,
        title: impl Into<String>,
        description: impl Into<String>,
        tags: impl Into<String>,
        total_size: u64,
    ) -> Self {
        FileRecord {
            id,
            title: title.into(),
            description: description.into(),
            tags: tags.into(),
            total_size,
            acquired_bytes: total_size,
            status: FileStatus::Installed,
            installed: true,
        }
    }

    /// Entry learned from a remote peer or server: no bytes held yet
    pub fn remote(entry: &SnapshotEntry) -> Self {
        FileRecord {
            id: entry.0.clone(),
            title: entry.1.clone(),
            description: entry.2.clone(),
            tags: entry.3.clone(),
            total_size: entry.4,
            acquired_bytes: 0,
            status: FileStatus::Pending,
            installed: false,
        }
    }

    /// Whether every byte of the file is held locally
    pub fn fully_held(&self) -> bool {
        self.acquired_bytes == self.total_size
    }

    /// Acquisition progress as a percentage
    pub fn percent(&self) -> f64 {
        if self.total_size == 0 {
            100.0
        } else {
            (self.acquired_bytes as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Metadata-only view of the entry, as exchanged on the wire
    pub fn to_entry(&self) -> SnapshotEntry {
        SnapshotEntry(
            self.id.clone(),
            self.title.clone(),
            self.description.clone(),
            self.tags.clone(),
            self.total_size,
        )
    }
}

/// Wire and persistence shape of an entry: `[id, title, description, tags, size]`
///
/// The 5-element list layout is the interchange format shared with older
/// catalog servers, so it is kept as a tuple rather than a keyed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry(pub FileId, pub String, pub String, pub String, pub u64);

impl SnapshotEntry {
    pub fn id(&self) -> &FileId {
        &self.0
    }

    pub fn total_size(&self) -> u64 {
        self.4
    }
}
