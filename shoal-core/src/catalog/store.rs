/*
    store.rs - The catalog mapping and its mutation entry points

    All mutations go through a single write lock so that local user actions
    and remote control messages never interleave. Reads hand out clones;
    nothing outside this module holds a reference into the map.
*/

use crate::catalog::errors::{CatalogError, CatalogResult};
use crate::catalog::events::{CatalogEvent, CatalogEvents};
use crate::catalog::record::{FileId, FileRecord, FileStatus, SnapshotEntry};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Capability token allowing removal of entries that hold acquired bytes.
///
/// Held by host/server roles acting on their own authoritative copy; remote
/// peers never get one.
#[derive(Debug, Clone, Copy)]
pub struct RemoveOverride(());

impl RemoveOverride {
    pub(crate) const fn token() -> Self {
        RemoveOverride(())
    }
}

/// The local mapping of known shareable file entries
pub struct Catalog {
    entries: RwLock<HashMap<FileId, FileRecord>>,
    events: CatalogEvents,
}

impl Catalog {
    pub fn new() -> Self {
        Self::with_events(CatalogEvents::default())
    }

    pub fn with_events(events: CatalogEvents) -> Self {
        Catalog {
            entries: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to catalog change events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    /// Insert a record if its id is absent. Returns whether it was inserted;
    /// a later add for an existing id is a no-op (first writer wins), so a
    /// locally-removed-but-in-transfer entry is never resurrected.
    pub async fn add(&self, record: FileRecord) -> bool {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&record.id) {
            debug!(id = %record.id, "add ignored, entry already present");
            return false;
        }
        let id = record.id.clone();
        entries.insert(id.clone(), record);
        drop(entries);
        self.events.emit(CatalogEvent::EntryAdded(id));
        true
    }

    /// Merge metadata entries learned from a snapshot or server file list.
    /// Existing local entries are never overwritten. Returns the ids that
    /// were actually inserted.
    pub async fn merge_entries(&self, incoming: Vec<SnapshotEntry>) -> Vec<FileId> {
        let mut inserted = Vec::new();
        for entry in incoming {
            if self.add(FileRecord::remote(&entry)).await {
                inserted.push(entry.0);
            }
        }
        inserted
    }

    /// Remove an entry. Refused with `TransferInProgress` while any bytes
    /// are acquired, unless the caller holds the override capability.
    pub async fn remove(
        &self,
        id: &FileId,
        override_token: Option<RemoveOverride>,
    ) -> CatalogResult<FileRecord> {
        let mut entries = self.entries.write().await;
        let record = entries
            .get(id)
            .ok_or_else(|| CatalogError::UnknownFile(id.to_string()))?;

        if record.acquired_bytes > 0 && override_token.is_none() {
            return Err(CatalogError::TransferInProgress(id.to_string()));
        }

        let removed = entries.remove(id).expect("entry checked above");
        drop(entries);
        self.events.emit(CatalogEvent::EntryRemoved(id.clone()));
        Ok(removed)
    }

    /// Record transfer progress. Progress may only grow; a regression is
    /// rejected with `InvalidProgress` and leaves the entry unchanged.
    pub async fn update_progress(&self, id: &FileId, acquired_bytes: u64) -> CatalogResult<()> {
        let mut entries = self.entries.write().await;
        let record = entries
            .get_mut(id)
            .ok_or_else(|| CatalogError::UnknownFile(id.to_string()))?;

        if acquired_bytes < record.acquired_bytes {
            return Err(CatalogError::InvalidProgress {
                id: id.to_string(),
                current: record.acquired_bytes,
                requested: acquired_bytes,
            });
        }
        if acquired_bytes > record.total_size {
            return Err(CatalogError::ProgressOverflow {
                id: id.to_string(),
                requested: acquired_bytes,
                total: record.total_size,
            });
        }
        if acquired_bytes == record.acquired_bytes {
            return Ok(());
        }

        record.acquired_bytes = acquired_bytes;
        let status_changed = record.status != FileStatus::Downloading;
        record.status = FileStatus::Downloading;
        drop(entries);

        self.events.emit(CatalogEvent::ProgressChanged {
            id: id.clone(),
            acquired_bytes,
        });
        if status_changed {
            self.events.emit(CatalogEvent::StatusChanged {
                id: id.clone(),
                status: FileStatus::Downloading,
            });
        }
        Ok(())
    }

    /// Terminal transition: all bytes held and installed into the bundle store
    pub async fn mark_installed(&self, id: &FileId) -> CatalogResult<()> {
        let mut entries = self.entries.write().await;
        let record = entries
            .get_mut(id)
            .ok_or_else(|| CatalogError::UnknownFile(id.to_string()))?;

        record.acquired_bytes = record.total_size;
        record.status = FileStatus::Installed;
        record.installed = true;
        let acquired = record.acquired_bytes;
        drop(entries);

        self.events.emit(CatalogEvent::ProgressChanged {
            id: id.clone(),
            acquired_bytes: acquired,
        });
        self.events.emit(CatalogEvent::StatusChanged {
            id: id.clone(),
            status: FileStatus::Installed,
        });
        Ok(())
    }

    /// Terminal transition: the transfer or install failed, acquired bytes
    /// are discarded and the entry may be retried from zero
    pub async fn mark_failed(&self, id: &FileId) -> CatalogResult<()> {
        let mut entries = self.entries.write().await;
        let record = entries
            .get_mut(id)
            .ok_or_else(|| CatalogError::UnknownFile(id.to_string()))?;

        record.acquired_bytes = 0;
        record.status = FileStatus::Failed;
        record.installed = false;
        drop(entries);

        self.events.emit(CatalogEvent::ProgressChanged {
            id: id.clone(),
            acquired_bytes: 0,
        });
        self.events.emit(CatalogEvent::StatusChanged {
            id: id.clone(),
            status: FileStatus::Failed,
        });
        Ok(())
    }

    /// Replace an existing record's fields in place. No-op if the id is
    /// unknown; returns whether a record was replaced.
    pub async fn update_record(&self, record: FileRecord) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&record.id) {
            Some(existing) => {
                let id = record.id.clone();
                let status = record.status;
                *existing = record;
                drop(entries);
                self.events.emit(CatalogEvent::StatusChanged { id, status });
                true
            }
            None => false,
        }
    }

    /// Drop every entry, emitting a removal event per id. Underlying bytes
    /// in the bundle store are untouched; remote peers may still be
    /// downloading them.
    pub async fn clear(&self) -> Vec<FileId> {
        let mut entries = self.entries.write().await;
        let ids: Vec<FileId> = entries.keys().cloned().collect();
        entries.clear();
        drop(entries);
        for id in &ids {
            self.events.emit(CatalogEvent::EntryRemoved(id.clone()));
        }
        ids
    }

    pub async fn get(&self, id: &FileId) -> Option<FileRecord> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &FileId) -> bool {
        self.entries.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Immutable copy of every record
    pub async fn records(&self) -> HashMap<FileId, FileRecord> {
        self.entries.read().await.clone()
    }

    /// Serializable metadata-only copy of the whole mapping, for handoff to
    /// a newly joined peer or for persistence
    pub async fn snapshot(&self) -> HashMap<FileId, SnapshotEntry> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(id, rec)| (id.clone(), rec.to_entry()))
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
